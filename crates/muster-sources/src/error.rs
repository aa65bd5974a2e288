//! Source adapter error types.

use muster_core::RecordSource;

/// Errors from a source adapter.
///
/// Error statuses and unparseable bodies are not errors: the adapter logs
/// them and reports zero results. Only transport failures surface here.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connect, TLS or timeout failure.
    #[error("HTTP error calling {id}: {error}")]
    Transport {
        id: RecordSource,
        #[source]
        error: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    ClientInit(#[source] reqwest::Error),
}
