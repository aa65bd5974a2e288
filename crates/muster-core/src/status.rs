//! # Canonical Verification Status
//!
//! The coarse status space exposed to clients, independent of the provider's
//! own step vocabulary.
//!
//! ## States
//!
//! ```text
//! Pending ──▶ Processing ──▶ Approved          (terminal)
//!                 │  ▲   ──▶ Rejected          (terminal)
//!                 │  │   ──▶ Error             (terminal for this attempt)
//!                 │  │   ──▶ Expired           (terminal)
//!                 ▼  │
//!          DocumentRequired
//! ```
//!
//! `DocumentRequired` loops back to `Processing` once a document has been
//! accepted by the provider. No other edge exists.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Session exists locally; nothing submitted yet.
    Pending,
    /// Submitted; the provider is still working.
    Processing,
    /// Eligibility confirmed (terminal).
    Approved,
    /// Eligibility denied (terminal).
    Rejected,
    /// The provider wants supporting documentation.
    DocumentRequired,
    /// The attempt failed; retry by starting a new session.
    Error,
    /// The attempt lapsed (terminal).
    Expired,
}

impl VerificationStatus {
    /// Every status, in declaration order.
    pub const ALL: [VerificationStatus; 7] = [
        Self::Pending,
        Self::Processing,
        Self::Approved,
        Self::Rejected,
        Self::DocumentRequired,
        Self::Error,
        Self::Expired,
    ];

    /// Whether no further transition is possible from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Expired | Self::Error
        )
    }

    /// Whether `self → next` is an edge of the status graph.
    pub fn can_transition_to(&self, next: VerificationStatus) -> bool {
        use VerificationStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Approved)
                | (Processing, Rejected)
                | (Processing, DocumentRequired)
                | (Processing, Error)
                | (Processing, Expired)
                | (DocumentRequired, Processing)
        )
    }

    /// Validate `self → next`, returning a structured error for illegal edges.
    pub fn check_transition(&self, next: VerificationStatus) -> Result<(), StatusError> {
        if self.is_terminal() {
            return Err(StatusError::TerminalState { state: *self });
        }
        if !self.can_transition_to(next) {
            return Err(StatusError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        Ok(())
    }

    /// The snake_case wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::DocumentRequired => "document_required",
            Self::Error => "error",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::DocumentRequired => "DOCUMENT_REQUIRED",
            Self::Error => "ERROR",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// Errors raised when a status change would leave the graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The edge does not exist.
    #[error("invalid verification transition: {from} -> {to}")]
    InvalidTransition {
        from: VerificationStatus,
        to: VerificationStatus,
    },

    /// The session is already in a terminal status.
    #[error("verification is in terminal state {state}")]
    TerminalState { state: VerificationStatus },
}
