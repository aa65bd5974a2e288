//! Engine error types.
//!
//! These are caller-contract violations and infrastructure failures.
//! Expected verification failures (provider said no, provider unreachable
//! mid-submission) are reported as `ERROR` outcomes, not as errors.

use uuid::Uuid;

use muster_core::{InvalidQuery, RecordError, RecordSource, RepositoryError, StatusError, VerificationStatus};
use muster_provider::ProviderError;
use muster_sources::SourceError;

/// Errors from [`crate::VerificationDriver`].
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The operation is not allowed from the session's current status.
    #[error("cannot {operation} a session in status {status}")]
    InvalidState {
        operation: &'static str,
        status: VerificationStatus,
    },

    #[error(transparent)]
    InvalidTransition(#[from] StatusError),

    /// The session has no provider session to drive.
    #[error("session {session_id} is not linked to a provider session")]
    ProviderLinkMissing { session_id: Uuid },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid personal record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("a contact email is required")]
    InvalidContact,

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[source] RepositoryError),

    /// Provider unreachable while establishing linkage.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),
}

/// Errors from [`crate::LookupAggregator`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LookupError {
    #[error(transparent)]
    InvalidQuery(#[from] InvalidQuery),

    #[error("source {0} is not configured")]
    SourceNotConfigured(RecordSource),
}

/// Errors building [`crate::Services`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    ProviderConfig(#[from] muster_provider::ConfigError),

    #[error(transparent)]
    SourcesConfig(#[from] muster_sources::ConfigError),

    #[error("invalid {var}: {reason}")]
    CacheConfig { var: &'static str, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Source(#[from] SourceError),
}
