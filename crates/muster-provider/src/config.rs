//! Verification provider client configuration.
//!
//! Defaults point at the provider's public REST base. The API key and the
//! program id are operator-supplied and have no defaults.

use url::Url;
use zeroize::Zeroizing;

use muster_core::ServiceKind;

/// Default provider REST base.
pub const DEFAULT_PROVIDER_URL: &str = "https://services.sheerid.com/rest/v2";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the verification provider.
///
/// Custom `Debug` implementation redacts the `api_key` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider REST base, e.g. `https://services.sheerid.com/rest/v2`.
    pub base_url: Url,
    /// Bearer token for API authentication. Zeroed on drop.
    pub api_key: Zeroizing<String>,
    /// Program the operator registered with the provider.
    pub program_id: String,
    /// Service kinds whose sessions are linked to a provider session.
    pub linked_kinds: Vec<ServiceKind>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("program_id", &self.program_id)
            .field("linked_kinds", &self.linked_kinds)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MUSTER_PROVIDER_URL` (default: `https://services.sheerid.com/rest/v2`)
    /// - `MUSTER_PROVIDER_API_KEY` (required)
    /// - `MUSTER_PROVIDER_PROGRAM_ID` (required)
    /// - `MUSTER_PROVIDER_LINKED_KINDS` (comma list, default: `chatgpt`)
    /// - `MUSTER_PROVIDER_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(lookup("MUSTER_PROVIDER_API_KEY")).ok_or(ConfigError::MissingApiKey)?;
        let program_id =
            non_empty(lookup("MUSTER_PROVIDER_PROGRAM_ID")).ok_or(ConfigError::MissingProgramId)?;

        let raw_url = lookup("MUSTER_PROVIDER_URL").unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string());
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidUrl("MUSTER_PROVIDER_URL".to_string(), e.to_string()))?;

        let linked_kinds = match lookup("MUSTER_PROVIDER_LINKED_KINDS") {
            Some(raw) => parse_kinds(&raw)?,
            None => vec![ServiceKind::Chatgpt],
        };

        Ok(Self {
            base_url,
            api_key: Zeroizing::new(api_key),
            program_id,
            linked_kinds,
            timeout_secs: lookup("MUSTER_PROVIDER_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base_url` cannot be parsed.
    pub fn local_mock(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl("local_mock".to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            api_key: Zeroizing::new(api_key.to_string()),
            program_id: "test-program".to_string(),
            linked_kinds: vec![ServiceKind::Chatgpt],
            timeout_secs: 5,
        })
    }

    /// Whether sessions of `kind` get a provider session on creation.
    pub fn is_linked(&self, kind: ServiceKind) -> bool {
        self.linked_kinds.contains(&kind)
    }

    /// Base URL without a trailing slash, for path concatenation.
    pub(crate) fn base(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_kinds(raw: &str) -> Result<Vec<ServiceKind>, ConfigError> {
    let mut kinds = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind = ServiceKind::parse(name).ok_or_else(|| ConfigError::UnknownServiceKind(name.to_string()))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MUSTER_PROVIDER_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("MUSTER_PROVIDER_PROGRAM_ID environment variable is required")]
    MissingProgramId,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("unknown service kind in MUSTER_PROVIDER_LINKED_KINDS: {0}")]
    UnknownServiceKind(String),
    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,
}
