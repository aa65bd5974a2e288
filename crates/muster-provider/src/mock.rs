//! Scripted in-process provider for tests and local development.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use muster_core::{DocumentType, MilitaryStatus};

use crate::client::{PersonalInfoRequest, ProviderStep, VerificationProvider};
use crate::error::ProviderError;
use crate::steps;

/// One provider operation, as recorded by [`MockVerificationProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCall {
    CreateSession,
    MilitaryStatus,
    PersonalInfo,
    UploadDocument,
    CompleteUpload,
    CurrentStep,
}

impl ProviderCall {
    fn endpoint(&self) -> &'static str {
        match self {
            Self::CreateSession => "POST /verification",
            Self::MilitaryStatus => "POST /step/collectMilitaryStatus",
            Self::PersonalInfo => "POST /step/collectMilitaryPersonalInfo",
            Self::UploadDocument => "POST /step/docUpload",
            Self::CompleteUpload => "POST /step/completeDocUpload",
            Self::CurrentStep => "GET /verification/{id}",
        }
    }
}

#[derive(Debug)]
struct Script {
    session_id: String,
    after_personal_info: String,
    after_complete_upload: String,
    polls: VecDeque<String>,
    failing: HashSet<ProviderCall>,
    calls: Vec<ProviderCall>,
    personal_info: Vec<PersonalInfoRequest>,
}

/// Deterministic provider.
///
/// By default every call succeeds: sessions are created as `mock-session`,
/// the personal-info step answers `pending`, the document hand-off answers
/// `pending`, and polls answer `pending` until scripted otherwise.
#[derive(Debug)]
pub struct MockVerificationProvider {
    script: Mutex<Script>,
}

impl Default for MockVerificationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVerificationProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                session_id: "mock-session".to_string(),
                after_personal_info: steps::PENDING.to_string(),
                after_complete_upload: steps::PENDING.to_string(),
                polls: VecDeque::new(),
                failing: HashSet::new(),
                calls: Vec::new(),
                personal_info: Vec::new(),
            }),
        }
    }

    pub fn with_session_id(self, id: &str) -> Self {
        self.script.lock().session_id = id.to_string();
        self
    }

    /// Token returned by the personal-info step.
    pub fn with_personal_info_step(self, token: &str) -> Self {
        self.script.lock().after_personal_info = token.to_string();
        self
    }

    /// Token returned by the completion phase of the document hand-off.
    pub fn with_upload_step(self, token: &str) -> Self {
        self.script.lock().after_complete_upload = token.to_string();
        self
    }

    /// Queue a token for the next poll. Once drained, polls answer `pending`.
    pub fn push_poll(&self, token: &str) {
        self.script.lock().polls.push_back(token.to_string());
    }

    /// Make `call` fail with a 503 until [`recover`](Self::recover).
    pub fn fail(&self, call: ProviderCall) {
        self.script.lock().failing.insert(call);
    }

    pub fn recover(&self, call: ProviderCall) {
        self.script.lock().failing.remove(&call);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.script.lock().calls.clone()
    }

    pub fn count(&self, call: ProviderCall) -> usize {
        self.script.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Personal-info bodies received so far.
    pub fn personal_info_received(&self) -> Vec<PersonalInfoRequest> {
        self.script.lock().personal_info.clone()
    }

    fn record(&self, call: ProviderCall) -> Result<(), ProviderError> {
        let mut script = self.script.lock();
        script.calls.push(call);
        if script.failing.contains(&call) {
            return Err(ProviderError::Rejected {
                endpoint: call.endpoint().to_string(),
                status: 503,
                body: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VerificationProvider for MockVerificationProvider {
    async fn create_session(&self, _program_id: &str) -> Result<ProviderStep, ProviderError> {
        self.record(ProviderCall::CreateSession)?;
        Ok(ProviderStep {
            verification_id: Some(self.script.lock().session_id.clone()),
            current_step: Some(steps::COLLECT_MILITARY_STATUS.to_string()),
            error_ids: Vec::new(),
        })
    }

    async fn submit_military_status(
        &self,
        _provider_session_id: &str,
        _status: MilitaryStatus,
    ) -> Result<ProviderStep, ProviderError> {
        self.record(ProviderCall::MilitaryStatus)?;
        Ok(ProviderStep::at(steps::COLLECT_PERSONAL_INFO))
    }

    async fn submit_personal_info(
        &self,
        _provider_session_id: &str,
        info: &PersonalInfoRequest,
    ) -> Result<ProviderStep, ProviderError> {
        self.record(ProviderCall::PersonalInfo)?;
        let mut script = self.script.lock();
        script.personal_info.push(info.clone());
        Ok(ProviderStep::at(&script.after_personal_info))
    }

    async fn upload_document(
        &self,
        _provider_session_id: &str,
        _bytes: &[u8],
        _doc_type: DocumentType,
    ) -> Result<ProviderStep, ProviderError> {
        self.record(ProviderCall::UploadDocument)?;
        Ok(ProviderStep::at(steps::COMPLETE_DOC_UPLOAD))
    }

    async fn complete_document_upload(
        &self,
        _provider_session_id: &str,
    ) -> Result<ProviderStep, ProviderError> {
        self.record(ProviderCall::CompleteUpload)?;
        Ok(ProviderStep::at(&self.script.lock().after_complete_upload))
    }

    async fn current_step(&self, _provider_session_id: &str) -> Result<ProviderStep, ProviderError> {
        self.record(ProviderCall::CurrentStep)?;
        let token = self
            .script
            .lock()
            .polls
            .pop_front()
            .unwrap_or_else(|| steps::PENDING.to_string());
        Ok(ProviderStep::at(&token))
    }
}
