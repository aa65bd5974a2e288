//! Provider call failures.
//!
//! Transport failures are split by what the provider may have seen:
//!
//! | Variant | Request reached the provider? |
//! |---------|-------------------------------|
//! | [`ProviderError::Unreachable`] | No. Safe to send again. |
//! | [`ProviderError::Timeout`] | Unknown. The step may have been applied. |
//! | [`ProviderError::Transport`] | Unknown. |
//!
//! A non-2xx answer ([`ProviderError::Rejected`]) and an unreadable body
//! ([`ProviderError::Deserialization`]) both mean the provider handled the
//! request.

/// Errors from provider calls. Every call variant names the endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Connection could not be established; nothing was sent.
    #[error("{endpoint}: provider unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// No answer within the client timeout.
    #[error("{endpoint}: no answer before the timeout, outcome unknown: {source}")]
    Timeout {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Connection dropped mid-exchange or similar.
    #[error("{endpoint}: transport failure, outcome unknown: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-2xx status.
    #[error("{endpoint}: provider returned {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint}: unreadable provider response: {source}")]
    Deserialization {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be built.
    #[error("failed to build provider client: {0}")]
    ClientInit(#[source] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl ProviderError {
    /// Classify a `reqwest` send failure for `endpoint`.
    pub(crate) fn from_send(endpoint: &str, source: reqwest::Error) -> Self {
        let endpoint = endpoint.to_string();
        // A connect timeout is both; it still never reached the provider.
        if source.is_connect() {
            Self::Unreachable { endpoint, source }
        } else if source.is_timeout() {
            Self::Timeout { endpoint, source }
        } else {
            Self::Transport { endpoint, source }
        }
    }

    /// The endpoint label, when the error came from a call.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Unreachable { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Rejected { endpoint, .. }
            | Self::Deserialization { endpoint, .. } => Some(endpoint),
            Self::ClientInit(_) | Self::Config(_) => None,
        }
    }

    /// Whether the provider may have acted on the request even though the
    /// caller saw a failure. Resending such a step risks applying it twice.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }

    /// Whether the request was never delivered.
    pub fn never_sent(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::ClientInit(_) | Self::Config(_))
    }
}
