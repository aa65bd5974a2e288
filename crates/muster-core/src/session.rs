//! # Verification Sessions
//!
//! A [`VerificationSession`] identifies one run of the external
//! verification protocol. It is created on the first client request and is
//! mutated only by the protocol driver; sessions are never deleted.
//!
//! ## Invariants
//!
//! - `provider_session_id` is set at most once and never changes afterwards.
//! - `status` changes only along the edges of the status graph
//!   (see [`VerificationStatus::can_transition_to`]), and every change is
//!   appended to `transitions`.
//! - `completed_at` is set iff `status` is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::status::{StatusError, VerificationStatus};

/// The downstream service the subject is proving eligibility for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Chatgpt,
    Spotify,
    Youtube,
    GoogleOne,
    Other,
}

impl ServiceKind {
    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chatgpt => "chatgpt",
            Self::Spotify => "spotify",
            Self::Youtube => "youtube",
            Self::GoogleOne => "google_one",
            Self::Other => "other",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chatgpt" => Some(Self::Chatgpt),
            "spotify" => Some(Self::Spotify),
            "youtube" => Some(Self::Youtube),
            "google_one" => Some(Self::GoogleOne),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a session's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: VerificationStatus,
    pub to: VerificationStatus,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// Raised when a session is linked to a second provider session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("session already linked to provider session {existing}")]
pub struct ProviderAlreadyLinked {
    pub existing: String,
}

/// One run of the external verification protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub session_id: Uuid,
    #[serde(default)]
    pub provider_session_id: Option<String>,
    pub service_kind: ServiceKind,
    #[serde(default)]
    pub program_id: Option<String>,
    pub status: VerificationStatus,
    /// Last step token reported by the provider, verbatim.
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub record_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
}

impl VerificationSession {
    /// Create a fresh `PENDING` session with no provider linkage.
    pub fn new(service_kind: ServiceKind, program_id: Option<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            provider_session_id: None,
            service_kind,
            program_id,
            status: VerificationStatus::Pending,
            current_step: None,
            record_id: None,
            created_at: Utc::now(),
            submitted_at: None,
            completed_at: None,
            error_message: None,
            transitions: Vec::new(),
        }
    }

    /// Whether the provider side of the protocol has been established.
    pub fn is_linked(&self) -> bool {
        self.provider_session_id.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Attach the provider's session id. Allowed exactly once.
    pub fn link_provider(&mut self, provider_session_id: String) -> Result<(), ProviderAlreadyLinked> {
        if let Some(existing) = &self.provider_session_id {
            return Err(ProviderAlreadyLinked {
                existing: existing.clone(),
            });
        }
        self.provider_session_id = Some(provider_session_id);
        Ok(())
    }

    /// Move to `to`, recording the edge. Terminal targets stamp `completed_at`.
    pub fn transition(&mut self, to: VerificationStatus, reason: &str) -> Result<(), StatusError> {
        self.status.check_transition(to)?;
        let at = Utc::now();
        self.transitions.push(TransitionRecord {
            from: self.status,
            to,
            at,
            reason: reason.to_string(),
        });
        self.status = to;
        if to.is_terminal() {
            self.completed_at = Some(at);
        }
        Ok(())
    }
}

/// Partial update applied by [`crate::Repository::update_session`].
///
/// `None` fields are left untouched. A provider session id is only written
/// when the stored session has none, so linkage can never be replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub status: Option<VerificationStatus>,
    pub provider_session_id: Option<String>,
    pub current_step: Option<String>,
    pub record_id: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub transitions: Option<Vec<TransitionRecord>>,
}

impl SessionUpdate {
    /// Capture every mutable field of `session`.
    pub fn capture(session: &VerificationSession) -> Self {
        Self {
            status: Some(session.status),
            provider_session_id: session.provider_session_id.clone(),
            current_step: session.current_step.clone(),
            record_id: session.record_id,
            submitted_at: session.submitted_at,
            completed_at: session.completed_at,
            error_message: session.error_message.clone(),
            transitions: Some(session.transitions.clone()),
        }
    }

    /// Only the error message.
    pub fn error_message(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the update in place.
    pub fn apply(&self, session: &mut VerificationSession) {
        if let Some(status) = self.status {
            session.status = status;
        }
        if session.provider_session_id.is_none() {
            if let Some(id) = &self.provider_session_id {
                session.provider_session_id = Some(id.clone());
            }
        }
        if let Some(step) = &self.current_step {
            session.current_step = Some(step.clone());
        }
        if let Some(record_id) = self.record_id {
            session.record_id = Some(record_id);
        }
        if let Some(at) = self.submitted_at {
            session.submitted_at = Some(at);
        }
        if let Some(at) = self.completed_at {
            session.completed_at = Some(at);
        }
        if let Some(message) = &self.error_message {
            session.error_message = Some(message.clone());
        }
        if let Some(transitions) = &self.transitions {
            session.transitions = transitions.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> VerificationSession {
        VerificationSession::new(ServiceKind::Chatgpt, None)
    }

    #[test]
    fn new_session_is_pending_and_unlinked() {
        let s = session();
        assert_eq!(s.status, VerificationStatus::Pending);
        assert!(!s.is_linked());
        assert!(s.completed_at.is_none());
        assert!(s.transitions.is_empty());
    }

    #[test]
    fn provider_link_is_set_once() {
        let mut s = session();
        s.link_provider("prov-1".into()).unwrap();
        let err = s.link_provider("prov-2".into()).unwrap_err();
        assert_eq!(err.existing, "prov-1");
        assert_eq!(s.provider_session_id.as_deref(), Some("prov-1"));
    }

    #[test]
    fn transition_records_history_and_completion() {
        let mut s = session();
        s.transition(VerificationStatus::Processing, "submitted").unwrap();
        assert!(s.completed_at.is_none());
        s.transition(VerificationStatus::Approved, "success").unwrap();
        assert!(s.completed_at.is_some());
        assert_eq!(s.transitions.len(), 2);
        assert_eq!(s.transitions[1].from, VerificationStatus::Processing);
        assert_eq!(s.transitions[1].to, VerificationStatus::Approved);
    }

    #[test]
    fn illegal_transition_leaves_session_untouched() {
        let mut s = session();
        assert!(s.transition(VerificationStatus::Approved, "skip").is_err());
        assert_eq!(s.status, VerificationStatus::Pending);
        assert!(s.transitions.is_empty());
    }

    #[test]
    fn document_loop_keeps_completed_at_unset() {
        let mut s = session();
        s.transition(VerificationStatus::Processing, "a").unwrap();
        s.transition(VerificationStatus::DocumentRequired, "b").unwrap();
        s.transition(VerificationStatus::Processing, "c").unwrap();
        assert!(s.completed_at.is_none());
        assert!(!s.is_terminal());
    }

    #[test]
    fn update_never_replaces_provider_link() {
        let mut s = session();
        s.link_provider("prov-1".into()).unwrap();
        let update = SessionUpdate {
            provider_session_id: Some("prov-2".into()),
            ..SessionUpdate::default()
        };
        update.apply(&mut s);
        assert_eq!(s.provider_session_id.as_deref(), Some("prov-1"));
    }

    #[test]
    fn capture_then_apply_reproduces_state() {
        let mut source = session();
        source.link_provider("prov-9".into()).unwrap();
        source.transition(VerificationStatus::Processing, "x").unwrap();
        source.current_step = Some("pending".into());

        let mut target = source.clone();
        target.status = VerificationStatus::Pending;
        target.transitions.clear();
        target.current_step = None;

        SessionUpdate::capture(&source).apply(&mut target);
        assert_eq!(target, source);
    }

    #[test]
    fn error_message_update_touches_one_field() {
        let update = SessionUpdate::error_message("upload failed");
        assert!(!update.is_empty());
        let mut s = session();
        update.apply(&mut s);
        assert_eq!(s.error_message.as_deref(), Some("upload failed"));
        assert_eq!(s.status, VerificationStatus::Pending);
    }

    #[test]
    fn service_kind_parse_round_trips_wire_names() {
        for kind in [
            ServiceKind::Chatgpt,
            ServiceKind::Spotify,
            ServiceKind::Youtube,
            ServiceKind::GoogleOne,
            ServiceKind::Other,
        ] {
            assert_eq!(ServiceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ServiceKind::parse("netflix"), None);
    }
}
