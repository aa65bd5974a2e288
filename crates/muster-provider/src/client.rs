//! Typed client for the verification provider REST API.
//!
//! ## Paths (relative to the configured base)
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/verification` | Create a provider session |
//! | POST | `/verification/{id}/step/collectMilitaryStatus` | Submit eligibility status |
//! | POST | `/verification/{id}/step/collectMilitaryPersonalInfo` | Submit personal info |
//! | POST | `/verification/{id}/step/docUpload` | Upload document bytes (multipart) |
//! | POST | `/verification/{id}/step/completeDocUpload` | Finish the document hand-off |
//! | GET  | `/verification/{id}` | Current step |
//!
//! Every response carries a `currentStep` token; translation to canonical
//! status happens in [`crate::steps`].
//!
//! POSTs advance provider state and go out exactly once. A timeout on one
//! surfaces as [`ProviderError::Timeout`]: the step may or may not have been
//! applied. Only the GET is resent after transport failures.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use muster_core::{DocumentType, MilitaryStatus, PersonalRecord};

use crate::config::{ConfigError, ProviderConfig};
use crate::delivery::Delivery;
use crate::error::ProviderError;
use crate::headers::RequestHeaders;
use crate::steps::{self, Organization};

/// Identifies this client to the provider.
pub const USER_AGENT: &str = concat!("muster/", env!("CARGO_PKG_VERSION"));

// -- Wire types ---------------------------------------------------------------

/// Provider response to any step call.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStep {
    #[serde(default)]
    pub verification_id: Option<String>,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub error_ids: Vec<String>,
}

impl ProviderStep {
    pub fn at(token: &str) -> Self {
        Self {
            current_step: Some(token.to_string()),
            ..Self::default()
        }
    }

    /// The step token, or `""` when the provider omitted it.
    pub fn token(&self) -> &str {
        self.current_step.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateVerificationRequest<'a> {
    program_id: &'a str,
}

#[derive(Debug, Serialize)]
struct MilitaryStatusRequest {
    status: MilitaryStatus,
}

/// Body of the personal-info step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfoRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    pub organization: Organization,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<String>,
}

impl PersonalInfoRequest {
    pub fn from_record(record: &PersonalRecord, email: &str) -> Self {
        Self {
            first_name: record.first_name.trim().to_string(),
            last_name: record.last_name.trim().to_string(),
            birth_date: record.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            organization: steps::organization(record.branch),
            email: email.trim().to_string(),
            discharge_date: record.discharge_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

// -- Trait --------------------------------------------------------------------

/// The provider protocol, one method per step.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// `Arc`. [`HttpVerificationProvider`] talks to the real service;
/// [`crate::MockVerificationProvider`] is scripted for tests.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    /// Open a provider session for `program_id`.
    async fn create_session(&self, program_id: &str) -> Result<ProviderStep, ProviderError>;

    async fn submit_military_status(
        &self,
        provider_session_id: &str,
        status: MilitaryStatus,
    ) -> Result<ProviderStep, ProviderError>;

    async fn submit_personal_info(
        &self,
        provider_session_id: &str,
        info: &PersonalInfoRequest,
    ) -> Result<ProviderStep, ProviderError>;

    /// First phase of the document hand-off: transfer the bytes.
    async fn upload_document(
        &self,
        provider_session_id: &str,
        bytes: &[u8],
        doc_type: DocumentType,
    ) -> Result<ProviderStep, ProviderError>;

    /// Second phase of the document hand-off.
    async fn complete_document_upload(
        &self,
        provider_session_id: &str,
    ) -> Result<ProviderStep, ProviderError>;

    async fn current_step(&self, provider_session_id: &str) -> Result<ProviderStep, ProviderError>;
}

// -- HTTP implementation ------------------------------------------------------

/// `reqwest`-backed provider client.
#[derive(Debug, Clone)]
pub struct HttpVerificationProvider {
    http: reqwest::Client,
    base: String,
}

impl HttpVerificationProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut auth =
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_key.as_str()))
                        .map_err(|_| ConfigError::InvalidApiKey)?;
                auth.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, auth);
                headers
            })
            .build()
            .map_err(ProviderError::ClientInit)?;

        Ok(Self {
            http,
            base: config.base(),
        })
    }

    fn step_url(&self, provider_session_id: &str, step: &str) -> String {
        format!("{}/verification/{provider_session_id}/step/{step}", self.base)
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        url: &str,
        body: &B,
    ) -> Result<ProviderStep, ProviderError> {
        let resp = Delivery::Once
            .send(endpoint, || {
                RequestHeaders::generate()
                    .apply(self.http.post(url))
                    .json(body)
                    .send()
            })
            .await?;
        read_step(endpoint, resp).await
    }
}

/// Reject non-2xx statuses, then decode the step body.
async fn read_step(endpoint: &str, resp: reqwest::Response) -> Result<ProviderStep, ProviderError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Rejected {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }

    resp.json().await.map_err(|e| ProviderError::Deserialization {
        endpoint: endpoint.into(),
        source: e,
    })
}

#[async_trait]
impl VerificationProvider for HttpVerificationProvider {
    async fn create_session(&self, program_id: &str) -> Result<ProviderStep, ProviderError> {
        let url = format!("{}/verification", self.base);
        let step = self
            .post_json("POST /verification", &url, &CreateVerificationRequest { program_id })
            .await?;
        tracing::info!(
            provider_session_id = step.verification_id.as_deref().unwrap_or("<missing>"),
            step = step.token(),
            "provider session created"
        );
        Ok(step)
    }

    async fn submit_military_status(
        &self,
        provider_session_id: &str,
        status: MilitaryStatus,
    ) -> Result<ProviderStep, ProviderError> {
        let url = self.step_url(provider_session_id, steps::COLLECT_MILITARY_STATUS);
        self.post_json(
            "POST /step/collectMilitaryStatus",
            &url,
            &MilitaryStatusRequest { status },
        )
        .await
    }

    async fn submit_personal_info(
        &self,
        provider_session_id: &str,
        info: &PersonalInfoRequest,
    ) -> Result<ProviderStep, ProviderError> {
        let url = self.step_url(provider_session_id, steps::COLLECT_PERSONAL_INFO);
        self.post_json("POST /step/collectMilitaryPersonalInfo", &url, info)
            .await
    }

    async fn upload_document(
        &self,
        provider_session_id: &str,
        bytes: &[u8],
        doc_type: DocumentType,
    ) -> Result<ProviderStep, ProviderError> {
        let endpoint = "POST /step/docUpload";
        let url = self.step_url(provider_session_id, steps::DOC_UPLOAD);
        let file_name = format!("{}.bin", doc_type.as_str().to_ascii_lowercase());

        let resp = Delivery::Once
            .send(endpoint, || {
                let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                let form = reqwest::multipart::Form::new()
                    .text("documentType", doc_type.as_str())
                    .part("file", part);
                RequestHeaders::generate()
                    .apply(self.http.post(&url))
                    .multipart(form)
                    .send()
            })
            .await?;
        let step = read_step(endpoint, resp).await?;
        tracing::info!(
            provider_session_id,
            bytes = bytes.len(),
            step = step.token(),
            "document transferred"
        );
        Ok(step)
    }

    async fn complete_document_upload(
        &self,
        provider_session_id: &str,
    ) -> Result<ProviderStep, ProviderError> {
        let url = self.step_url(provider_session_id, steps::COMPLETE_DOC_UPLOAD);
        self.post_json("POST /step/completeDocUpload", &url, &serde_json::json!({}))
            .await
    }

    async fn current_step(&self, provider_session_id: &str) -> Result<ProviderStep, ProviderError> {
        let endpoint = "GET /verification/{id}";
        let url = format!("{}/verification/{provider_session_id}", self.base);
        let resp = Delivery::Resendable
            .send(endpoint, || RequestHeaders::generate().apply(self.http.get(&url)).send())
            .await?;
        read_step(endpoint, resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use muster_core::MilitaryBranch;

    #[test]
    fn personal_info_serializes_provider_field_names() {
        let record = PersonalRecord::new(" Jane ", "Smith", MilitaryBranch::Navy)
            .with_birth_date(NaiveDate::from_ymd_opt(1950, 3, 4).unwrap());
        let body = serde_json::to_value(PersonalInfoRequest::from_record(&record, "j@example.com")).unwrap();
        assert_eq!(body["firstName"], "Jane");
        assert_eq!(body["birthDate"], "1950-03-04");
        assert_eq!(body["organization"]["id"], 4072);
        assert_eq!(body["organization"]["name"], "Navy");
        assert!(body.get("dischargeDate").is_none());
    }

    #[test]
    fn military_status_body_uses_screaming_case() {
        let body = serde_json::to_value(MilitaryStatusRequest {
            status: MilitaryStatus::Veteran,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"status": "VETERAN"}));
    }

    #[test]
    fn step_token_defaults_to_empty() {
        assert_eq!(ProviderStep::default().token(), "");
        assert_eq!(ProviderStep::at("pending").token(), "pending");
    }

    #[test]
    fn user_agent_names_the_client() {
        assert!(USER_AGENT.starts_with("muster/"));
    }
}
