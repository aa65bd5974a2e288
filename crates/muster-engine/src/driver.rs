//! # Verification Protocol Driver
//!
//! Drives one [`VerificationSession`] through the provider's step sequence:
//!
//! ```text
//! begin ─▶ submit (status step ─▶ personal-info step) ─▶ [upload_document] ─▶ poll
//! ```
//!
//! and keeps the canonical status in step with the provider's `currentStep`
//! token (translated by [`canonical_status`]).
//!
//! ## Outcomes vs errors
//!
//! A provider that fails or says no is an expected outcome: `submit` and
//! `upload_document` return an outcome with status `ERROR` and a message.
//! [`DriverError`] is reserved for caller-contract violations (wrong state,
//! missing linkage, bad input) and for `load` / `history`, which have no
//! useful in-memory fallback.
//!
//! ## Persistence
//!
//! Every state change is written through the [`Repository`] as a partial
//! update. A failed write is logged and the in-memory session stays
//! authoritative for the caller. Concurrent drivers on the same session are
//! last-write-wins.
//!
//! ## Partial submission
//!
//! If the status step succeeds and the personal-info step fails, nothing is
//! rolled back on the provider side. The session records `ERROR` and keeps
//! the last step token the provider acknowledged.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use muster_core::{
    DocumentType, PersonalRecord, Repository, RepositoryError, ServiceKind, SessionFilter,
    SessionUpdate, VerificationSession, VerificationStatus,
};
use muster_provider::{canonical_status, PersonalInfoRequest, ProviderConfig, ProviderError, VerificationProvider};

use crate::error::DriverError;

/// Largest page [`VerificationDriver::history`] returns.
pub const MAX_PAGE_SIZE: usize = 100;

// ─── Outcomes ────────────────────────────────────────────────────────

/// Client action required before the protocol can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    DocumentUpload,
}

/// Result of [`VerificationDriver::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub session_id: Uuid,
    pub status: VerificationStatus,
    pub message: String,
    pub next_step: Option<NextStep>,
}

/// Result of [`VerificationDriver::upload_document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub status: VerificationStatus,
    pub message: String,
}

/// One page of [`VerificationDriver::history`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPage {
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub items: Vec<VerificationSession>,
}

fn status_message(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Pending => "verification not yet submitted",
        VerificationStatus::Processing => "verification submitted; awaiting provider decision",
        VerificationStatus::Approved => "verification approved",
        VerificationStatus::Rejected => "verification rejected",
        VerificationStatus::DocumentRequired => "supporting document required",
        VerificationStatus::Error => "provider reported an error",
        VerificationStatus::Expired => "verification expired",
    }
}

// ─── Driver ──────────────────────────────────────────────────────────

/// Which sessions get a provider session, and under which program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub program_id: String,
    pub linked_kinds: Vec<ServiceKind>,
}

impl DriverConfig {
    pub fn from_provider(config: &ProviderConfig) -> Self {
        Self {
            program_id: config.program_id.clone(),
            linked_kinds: config.linked_kinds.clone(),
        }
    }

    pub fn is_linked(&self, kind: ServiceKind) -> bool {
        self.linked_kinds.contains(&kind)
    }
}

/// State machine over the provider protocol. Cheap to clone.
#[derive(Clone)]
pub struct VerificationDriver {
    provider: Arc<dyn VerificationProvider>,
    repo: Arc<dyn Repository>,
    config: DriverConfig,
}

impl std::fmt::Debug for VerificationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VerificationDriver {
    pub fn new(
        provider: Arc<dyn VerificationProvider>,
        repo: Arc<dyn Repository>,
        config: DriverConfig,
    ) -> Self {
        Self {
            provider,
            repo,
            config,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Create a `PENDING` session, linking it to a provider session when the
    /// service kind is provider-linked.
    ///
    /// Never fails: if the provider is unreachable the session is returned
    /// unlinked and [`link_provider`](Self::link_provider) can retry later.
    pub async fn begin(&self, service_kind: ServiceKind, program_id: Option<String>) -> VerificationSession {
        let program_id = program_id.unwrap_or_else(|| self.config.program_id.clone());
        let mut session = VerificationSession::new(service_kind, Some(program_id));

        if self.config.is_linked(service_kind) {
            if let Err(e) = self.attach_provider_session(&mut session).await {
                tracing::warn!(
                    session_id = %session.session_id,
                    "provider session creation failed, continuing unlinked: {e}"
                );
            }
        }

        if let Err(e) = self.repo.create_session(&session).await {
            tracing::warn!(session_id = %session.session_id, "failed to persist new session: {e}");
        }
        tracing::info!(
            session_id = %session.session_id,
            service_kind = %service_kind,
            linked = session.is_linked(),
            "verification session started"
        );
        session
    }

    /// Retry provider linkage for a `PENDING` session. No-op when linked.
    pub async fn link_provider(&self, session: &mut VerificationSession) -> Result<(), DriverError> {
        if session.is_linked() {
            return Ok(());
        }
        if session.status != VerificationStatus::Pending {
            return Err(DriverError::InvalidState {
                operation: "link",
                status: session.status,
            });
        }
        self.attach_provider_session(session)
            .await
            .map_err(DriverError::ProviderUnavailable)?;
        if !session.is_linked() {
            // The provider answered but did not hand out an id.
            return Err(DriverError::ProviderLinkMissing {
                session_id: session.session_id,
            });
        }
        self.persist(
            session,
            SessionUpdate {
                provider_session_id: session.provider_session_id.clone(),
                current_step: session.current_step.clone(),
                ..SessionUpdate::default()
            },
        )
        .await;
        Ok(())
    }

    async fn attach_provider_session(&self, session: &mut VerificationSession) -> Result<(), ProviderError> {
        let program_id = session
            .program_id
            .clone()
            .unwrap_or_else(|| self.config.program_id.clone());
        let step = self.provider.create_session(&program_id).await?;
        match step.verification_id {
            Some(id) => {
                if let Err(e) = session.link_provider(id) {
                    tracing::warn!(session_id = %session.session_id, "{e}");
                }
                session.current_step = step.current_step;
            }
            None => tracing::warn!(
                session_id = %session.session_id,
                "provider inconsistency: session created without a verification id"
            ),
        }
        Ok(())
    }

    /// Submit the subject's eligibility status and personal information.
    ///
    /// Allowed from `PENDING` (first submission) and `PROCESSING`
    /// (resubmission). A session that already has a stored record reuses it
    /// and ignores `record`.
    pub async fn submit(
        &self,
        session: &mut VerificationSession,
        record: PersonalRecord,
        contact_email: &str,
    ) -> Result<SubmitOutcome, DriverError> {
        if !matches!(
            session.status,
            VerificationStatus::Pending | VerificationStatus::Processing
        ) {
            return Err(DriverError::InvalidState {
                operation: "submit",
                status: session.status,
            });
        }
        let Some(provider_id) = session.provider_session_id.clone() else {
            return Err(DriverError::ProviderLinkMissing {
                session_id: session.session_id,
            });
        };
        if contact_email.trim().is_empty() {
            return Err(DriverError::InvalidContact);
        }
        let record = self.resolve_record(session, record).await?;

        if session.status == VerificationStatus::Pending {
            session.transition(VerificationStatus::Processing, "submitted")?;
        }
        session.record_id = Some(record.record_id);
        session.submitted_at = Some(Utc::now());
        self.persist(session, SessionUpdate::capture(session)).await;

        let token = match self.run_submission(session, &provider_id, &record, contact_email).await {
            Ok(token) => token,
            Err(e) => return self.fail_submission(session, e).await,
        };

        let mapped = canonical_status(&token);
        session.current_step = Some(token);
        if mapped != session.status {
            session.transition(mapped, "provider step")?;
        }
        if mapped == VerificationStatus::Error {
            session.error_message = Some(status_message(mapped).to_string());
        }
        self.persist(session, SessionUpdate::capture(session)).await;

        tracing::info!(
            session_id = %session.session_id,
            status = %session.status,
            step = session.current_step.as_deref().unwrap_or_default(),
            "verification submitted"
        );
        Ok(SubmitOutcome {
            session_id: session.session_id,
            status: session.status,
            message: status_message(session.status).to_string(),
            next_step: (session.status == VerificationStatus::DocumentRequired)
                .then_some(NextStep::DocumentUpload),
        })
    }

    /// Stored record for a resubmission, or validate and store `record`.
    async fn resolve_record(
        &self,
        session: &VerificationSession,
        record: PersonalRecord,
    ) -> Result<PersonalRecord, DriverError> {
        if let Some(record_id) = session.record_id {
            match self.repo.get_record(record_id).await {
                Ok(Some(stored)) => {
                    tracing::info!(session_id = %session.session_id, %record_id, "reusing stored personal record");
                    return Ok(stored);
                }
                Ok(None) => tracing::warn!(%record_id, "stored personal record missing, storing a new one"),
                Err(e) => tracing::warn!(%record_id, "failed to load stored personal record: {e}"),
            }
        }

        record.validate()?;
        if let Err(e) = self.repo.create_record(&record).await {
            tracing::warn!(session_id = %session.session_id, "failed to persist personal record: {e}");
        }
        Ok(record)
    }

    /// Status step then personal-info step. Returns the final step token.
    async fn run_submission(
        &self,
        session: &mut VerificationSession,
        provider_id: &str,
        record: &PersonalRecord,
        contact_email: &str,
    ) -> Result<String, ProviderError> {
        let step = self
            .provider
            .submit_military_status(provider_id, record.military_status)
            .await?;
        session.current_step = Some(step.token().to_string());

        let info = PersonalInfoRequest::from_record(record, contact_email);
        let step = self.provider.submit_personal_info(provider_id, &info).await?;
        Ok(step.token().to_string())
    }

    async fn fail_submission(
        &self,
        session: &mut VerificationSession,
        error: ProviderError,
    ) -> Result<SubmitOutcome, DriverError> {
        let message = error.to_string();
        tracing::error!(
            session_id = %session.session_id,
            outcome_unknown = error.outcome_unknown(),
            "verification submission failed: {message}"
        );
        session.transition(VerificationStatus::Error, "submission failed")?;
        session.error_message = Some(message.clone());
        self.persist(session, SessionUpdate::capture(session)).await;
        Ok(SubmitOutcome {
            session_id: session.session_id,
            status: VerificationStatus::Error,
            message,
            next_step: None,
        })
    }

    /// Hand a supporting document to the provider (transfer, then complete).
    ///
    /// Each phase is sent once. On failure the session stays
    /// `DOCUMENT_REQUIRED` so the caller can try again; only the error
    /// message is recorded. On success the session returns to `PROCESSING`,
    /// then follows the completion token if it already carries a decision.
    pub async fn upload_document(
        &self,
        session: &mut VerificationSession,
        bytes: &[u8],
        doc_type: DocumentType,
    ) -> Result<UploadOutcome, DriverError> {
        if session.status != VerificationStatus::DocumentRequired {
            return Err(DriverError::InvalidState {
                operation: "upload a document for",
                status: session.status,
            });
        }
        if bytes.is_empty() {
            return Err(DriverError::InvalidDocument("document is empty".into()));
        }
        let Some(provider_id) = session.provider_session_id.clone() else {
            return Err(DriverError::ProviderLinkMissing {
                session_id: session.session_id,
            });
        };

        let handoff = async {
            self.provider.upload_document(&provider_id, bytes, doc_type).await?;
            self.provider.complete_document_upload(&provider_id).await
        };
        let step = match handoff.await {
            Ok(step) => step,
            Err(e) => {
                let mut message = e.to_string();
                if e.outcome_unknown() {
                    message.push_str("; the provider may already hold the document");
                }
                tracing::error!(
                    session_id = %session.session_id,
                    outcome_unknown = e.outcome_unknown(),
                    "document hand-off failed: {message}"
                );
                session.error_message = Some(message.clone());
                self.persist(session, SessionUpdate::error_message(message.clone())).await;
                return Ok(UploadOutcome {
                    status: VerificationStatus::Error,
                    message,
                });
            }
        };

        // The hand-off itself always moves the session back to review; the
        // completion token may already carry the decision.
        session.transition(VerificationStatus::Processing, "document uploaded")?;
        let mapped = canonical_status(step.token());
        if mapped != VerificationStatus::Processing {
            session.transition(mapped, "provider step")?;
        }
        if mapped == VerificationStatus::Error {
            session.error_message = Some(status_message(mapped).to_string());
        }
        session.current_step = Some(step.token().to_string());
        self.persist(session, SessionUpdate::capture(session)).await;
        tracing::info!(
            session_id = %session.session_id,
            doc_type = doc_type.as_str(),
            bytes = bytes.len(),
            status = %session.status,
            "supporting document accepted"
        );
        let message = match session.status {
            VerificationStatus::Processing => "document submitted for review",
            other => status_message(other),
        };
        Ok(UploadOutcome {
            status: session.status,
            message: message.to_string(),
        })
    }

    /// Refresh status from the provider.
    ///
    /// Contacts the provider only for a linked `PROCESSING` session, and
    /// writes only when the mapped status changed. Anything else, including
    /// a provider failure, returns the stored status.
    pub async fn poll(&self, session: &mut VerificationSession) -> VerificationStatus {
        if session.status != VerificationStatus::Processing {
            return session.status;
        }
        let Some(provider_id) = session.provider_session_id.clone() else {
            return session.status;
        };

        let step = match self.provider.current_step(&provider_id).await {
            Ok(step) => step,
            Err(e) => {
                tracing::warn!(session_id = %session.session_id, "status poll failed: {e}");
                return session.status;
            }
        };

        let mapped = canonical_status(step.token());
        if mapped == session.status {
            return session.status;
        }
        if let Err(e) = session.transition(mapped, "provider poll") {
            tracing::warn!(session_id = %session.session_id, "ignoring polled status: {e}");
            return session.status;
        }
        session.current_step = Some(step.token().to_string());
        if mapped == VerificationStatus::Error {
            session.error_message = Some(status_message(mapped).to_string());
        }
        self.persist(session, SessionUpdate::capture(session)).await;
        tracing::info!(session_id = %session.session_id, status = %mapped, "verification status changed");
        session.status
    }

    /// Fetch a session from the repository.
    pub async fn load(&self, session_id: Uuid) -> Result<VerificationSession, DriverError> {
        self.repo
            .get_session(session_id)
            .await
            .map_err(DriverError::PersistenceUnavailable)?
            .ok_or(DriverError::SessionNotFound(session_id))
    }

    /// Newest-first page of sessions. `page` is 1-based; `per_page` is
    /// clamped to `1..=100`.
    pub async fn history(
        &self,
        filter: &SessionFilter,
        page: usize,
        per_page: usize,
    ) -> Result<SessionPage, DriverError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let sessions = self
            .repo
            .list_sessions(filter)
            .await
            .map_err(DriverError::PersistenceUnavailable)?;
        let total = sessions.len();
        let items = sessions
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();
        Ok(SessionPage {
            total,
            page,
            per_page,
            items,
        })
    }

    async fn persist(&self, session: &VerificationSession, update: SessionUpdate) {
        if let Err(e) = self.repo.update_session(session.session_id, &update).await {
            match &e {
                RepositoryError::NotFound { .. } => tracing::warn!(
                    session_id = %session.session_id,
                    "session missing from repository, update dropped"
                ),
                RepositoryError::Unavailable(_) => tracing::warn!(
                    session_id = %session.session_id,
                    "persistence unavailable, keeping in-memory state: {e}"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::{InMemoryRepository, MilitaryBranch};
    use muster_provider::{MockVerificationProvider, ProviderCall};

    fn driver(provider: MockVerificationProvider) -> (VerificationDriver, Arc<MockVerificationProvider>, InMemoryRepository) {
        let provider = Arc::new(provider);
        let repo = InMemoryRepository::new();
        let driver = VerificationDriver::new(
            provider.clone(),
            Arc::new(repo.clone()),
            DriverConfig {
                program_id: "prog".into(),
                linked_kinds: vec![ServiceKind::Chatgpt],
            },
        );
        (driver, provider, repo)
    }

    fn record() -> PersonalRecord {
        PersonalRecord::new("Jane", "Smith", MilitaryBranch::Navy)
    }

    #[tokio::test]
    async fn unlinked_kind_skips_provider() {
        let (driver, provider, repo) = driver(MockVerificationProvider::new());
        let session = driver.begin(ServiceKind::Spotify, None).await;
        assert!(!session.is_linked());
        assert_eq!(session.program_id.as_deref(), Some("prog"));
        assert!(provider.calls().is_empty());
        assert_eq!(repo.session_count(), 1);
    }

    #[tokio::test]
    async fn begin_survives_provider_outage_and_link_retries() {
        let (driver, provider, repo) = driver(MockVerificationProvider::new());
        provider.fail(ProviderCall::CreateSession);
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        assert_eq!(session.status, VerificationStatus::Pending);
        assert!(!session.is_linked());

        let err = driver.link_provider(&mut session).await.unwrap_err();
        assert!(matches!(err, DriverError::ProviderUnavailable(_)));

        provider.recover(ProviderCall::CreateSession);
        driver.link_provider(&mut session).await.unwrap();
        assert_eq!(session.provider_session_id.as_deref(), Some("mock-session"));
        let stored = repo.get_session(session.session_id).await.unwrap().unwrap();
        assert_eq!(stored.provider_session_id.as_deref(), Some("mock-session"));
    }

    #[tokio::test]
    async fn submit_without_link_is_an_error() {
        let (driver, provider, _) = driver(MockVerificationProvider::new());
        let mut session = driver.begin(ServiceKind::Other, None).await;
        let err = driver.submit(&mut session, record(), "j@example.com").await.unwrap_err();
        assert!(matches!(err, DriverError::ProviderLinkMissing { .. }));
        assert_eq!(session.status, VerificationStatus::Pending);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_rejects_bad_input_before_any_call() {
        let (driver, provider, _) = driver(MockVerificationProvider::new());
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;

        let err = driver.submit(&mut session, record(), "  ").await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidContact));

        let blank = PersonalRecord::new("", "Smith", MilitaryBranch::Army);
        let err = driver.submit(&mut session, blank, "j@example.com").await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidRecord(_)));
        assert_eq!(provider.calls(), vec![ProviderCall::CreateSession]);
    }

    #[tokio::test]
    async fn success_token_approves() {
        let (driver, _, _) = driver(MockVerificationProvider::new().with_personal_info_step("success"));
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        let outcome = driver.submit(&mut session, record(), "j@example.com").await.unwrap();
        assert_eq!(outcome.status, VerificationStatus::Approved);
        assert!(outcome.next_step.is_none());
        assert!(session.completed_at.is_some());
    }

    #[tokio::test]
    async fn partial_submission_records_error_and_last_step() {
        let (driver, provider, repo) = driver(MockVerificationProvider::new());
        provider.fail(ProviderCall::PersonalInfo);
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        let outcome = driver.submit(&mut session, record(), "j@example.com").await.unwrap();

        assert_eq!(outcome.status, VerificationStatus::Error);
        assert!(outcome.message.contains("503"));
        assert_eq!(session.current_step.as_deref(), Some("collectMilitaryPersonalInfo"));
        let stored = repo.get_session(session.session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, VerificationStatus::Error);
        assert!(stored.error_message.is_some());
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn terminal_session_cannot_be_resubmitted() {
        let (driver, _, _) = driver(MockVerificationProvider::new().with_personal_info_step("rejected"));
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        driver.submit(&mut session, record(), "j@example.com").await.unwrap();
        assert_eq!(session.status, VerificationStatus::Rejected);

        let err = driver.submit(&mut session, record(), "j@example.com").await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidState {
                status: VerificationStatus::Rejected,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn resubmission_reuses_stored_record() {
        let (driver, provider, repo) = driver(MockVerificationProvider::new());
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        let first = record();
        driver.submit(&mut session, first.clone(), "j@example.com").await.unwrap();
        assert_eq!(session.status, VerificationStatus::Processing);

        let other = PersonalRecord::new("Someone", "Else", MilitaryBranch::Army);
        driver.submit(&mut session, other, "j@example.com").await.unwrap();
        assert_eq!(repo.record_count(), 1);
        assert_eq!(session.record_id, Some(first.record_id));
        let bodies = provider.personal_info_received();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[1].first_name, "Jane");
    }

    #[tokio::test]
    async fn upload_requires_document_required() {
        let (driver, _, _) = driver(MockVerificationProvider::new());
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        let err = driver
            .upload_document(&mut session, b"pdf", DocumentType::Dd214)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn upload_failure_keeps_document_required() {
        let (driver, provider, repo) =
            driver(MockVerificationProvider::new().with_personal_info_step("docUpload"));
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        driver.submit(&mut session, record(), "j@example.com").await.unwrap();

        let err = driver
            .upload_document(&mut session, b"", DocumentType::Dd214)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidDocument(_)));

        provider.fail(ProviderCall::CompleteUpload);
        let outcome = driver
            .upload_document(&mut session, b"pdf", DocumentType::Dd214)
            .await
            .unwrap();
        assert_eq!(outcome.status, VerificationStatus::Error);
        assert_eq!(session.status, VerificationStatus::DocumentRequired);
        let stored = repo.get_session(session.session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, VerificationStatus::DocumentRequired);
        assert!(stored.error_message.is_some());

        provider.recover(ProviderCall::CompleteUpload);
        let outcome = driver
            .upload_document(&mut session, b"pdf", DocumentType::Dd214)
            .await
            .unwrap();
        assert_eq!(outcome.status, VerificationStatus::Processing);
        assert_eq!(provider.count(ProviderCall::UploadDocument), 2);
    }

    #[tokio::test]
    async fn upload_completion_token_decides_status() {
        let (driver, provider, repo) = driver(
            MockVerificationProvider::new()
                .with_session_id("prov-77")
                .with_personal_info_step("docUpload")
                .with_upload_step("success"),
        );
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        assert_eq!(session.provider_session_id.as_deref(), Some("prov-77"));
        driver.submit(&mut session, record(), "j@example.com").await.unwrap();

        let outcome = driver
            .upload_document(&mut session, b"pdf", DocumentType::Dd214)
            .await
            .unwrap();
        assert_eq!(outcome.status, VerificationStatus::Approved);
        assert_eq!(session.current_step.as_deref(), Some("success"));

        let stored = repo.get_session(session.session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, VerificationStatus::Approved);
        assert_eq!(stored.current_step.as_deref(), Some("success"));
        assert!(stored.completed_at.is_some());
        let path: Vec<_> = stored.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            path,
            vec![
                VerificationStatus::Processing,
                VerificationStatus::DocumentRequired,
                VerificationStatus::Processing,
                VerificationStatus::Approved,
            ]
        );
        // Already decided: nothing left to poll.
        assert_eq!(driver.poll(&mut session).await, VerificationStatus::Approved);
        assert_eq!(provider.count(ProviderCall::CurrentStep), 0);
    }

    #[tokio::test]
    async fn poll_applies_changed_status_once() {
        let (driver, provider, repo) = driver(MockVerificationProvider::new());
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        driver.submit(&mut session, record(), "j@example.com").await.unwrap();

        assert_eq!(driver.poll(&mut session).await, VerificationStatus::Processing);
        provider.push_poll("success");
        assert_eq!(driver.poll(&mut session).await, VerificationStatus::Approved);

        let writes = repo.write_count();
        assert_eq!(driver.poll(&mut session).await, VerificationStatus::Approved);
        assert_eq!(driver.poll(&mut session).await, VerificationStatus::Approved);
        assert_eq!(repo.write_count(), writes);
        assert_eq!(provider.count(ProviderCall::CurrentStep), 2);
    }

    #[tokio::test]
    async fn poll_outage_returns_stored_status() {
        let (driver, provider, _) = driver(MockVerificationProvider::new());
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        driver.submit(&mut session, record(), "j@example.com").await.unwrap();
        provider.fail(ProviderCall::CurrentStep);
        assert_eq!(driver.poll(&mut session).await, VerificationStatus::Processing);
    }

    #[tokio::test]
    async fn persistence_outage_keeps_in_memory_result() {
        let (driver, _, repo) = driver(MockVerificationProvider::new().with_personal_info_step("success"));
        repo.set_available(false);
        let mut session = driver.begin(ServiceKind::Chatgpt, None).await;
        assert!(session.is_linked());
        let outcome = driver.submit(&mut session, record(), "j@example.com").await.unwrap();
        assert_eq!(outcome.status, VerificationStatus::Approved);

        let err = driver.load(session.session_id).await.unwrap_err();
        assert!(matches!(err, DriverError::PersistenceUnavailable(_)));
    }

    #[tokio::test]
    async fn load_and_history() {
        let (driver, _, _) = driver(MockVerificationProvider::new());
        let a = driver.begin(ServiceKind::Chatgpt, None).await;
        let _b = driver.begin(ServiceKind::Spotify, None).await;
        let _c = driver.begin(ServiceKind::Spotify, None).await;

        assert_eq!(driver.load(a.session_id).await.unwrap().session_id, a.session_id);
        let missing = Uuid::new_v4();
        assert!(matches!(
            driver.load(missing).await,
            Err(DriverError::SessionNotFound(id)) if id == missing
        ));

        let filter = SessionFilter {
            service_kind: Some(ServiceKind::Spotify),
            ..SessionFilter::default()
        };
        let page = driver.history(&filter, 1, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        let page = driver.history(&filter, 3, 1).await.unwrap();
        assert!(page.items.is_empty());
        let page = driver.history(&SessionFilter::default(), 0, 0).await.unwrap();
        assert_eq!((page.page, page.per_page, page.total), (1, 1, 3));
    }
}
