//! Provider step vocabulary and its translation to canonical status.
//!
//! The provider reports progress as an opaque `currentStep` token. This is
//! the only place that token is interpreted; everything downstream works on
//! [`VerificationStatus`].

use muster_core::{MilitaryBranch, VerificationStatus};
use serde::Serialize;

pub const SUCCESS: &str = "success";
pub const REJECTED: &str = "rejected";
pub const DOC_UPLOAD: &str = "docUpload";
pub const ERROR: &str = "error";
pub const PENDING: &str = "pending";
pub const COLLECT_MILITARY_STATUS: &str = "collectMilitaryStatus";
pub const COLLECT_PERSONAL_INFO: &str = "collectMilitaryPersonalInfo";
pub const COLLECT_INACTIVE_PERSONAL_INFO: &str = "collectInactiveMilitaryPersonalInfo";
pub const COMPLETE_DOC_UPLOAD: &str = "completeDocUpload";

/// Tokens that mean "still in progress" and need no warning.
const IN_PROGRESS: &[&str] = &[
    PENDING,
    COLLECT_MILITARY_STATUS,
    COLLECT_PERSONAL_INFO,
    COLLECT_INACTIVE_PERSONAL_INFO,
    COMPLETE_DOC_UPLOAD,
];

/// Map a provider step token to canonical status.
///
/// | token       | status              |
/// |-------------|---------------------|
/// | `success`   | `APPROVED`          |
/// | `rejected`  | `REJECTED`          |
/// | `docUpload` | `DOCUMENT_REQUIRED` |
/// | `error`     | `ERROR`             |
/// | other       | `PROCESSING`        |
///
/// Unknown tokens are logged as a provider inconsistency.
pub fn canonical_status(token: &str) -> VerificationStatus {
    match token {
        SUCCESS => VerificationStatus::Approved,
        REJECTED => VerificationStatus::Rejected,
        DOC_UPLOAD => VerificationStatus::DocumentRequired,
        ERROR => VerificationStatus::Error,
        t if IN_PROGRESS.contains(&t) => VerificationStatus::Processing,
        unknown => {
            tracing::warn!(
                step = unknown,
                "provider inconsistency: unrecognized step token, treating as processing"
            );
            VerificationStatus::Processing
        }
    }
}

/// Provider-side organization a branch maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub id: u64,
    pub name: &'static str,
}

/// Organization registered with the provider for each branch.
pub fn organization(branch: MilitaryBranch) -> Organization {
    use MilitaryBranch::*;
    let (id, name) = match branch {
        Army => (4070, "Army"),
        AirForce => (4073, "Air Force"),
        Navy => (4072, "Navy"),
        MarineCorps => (4071, "Marine Corps"),
        CoastGuard => (4074, "Coast Guard"),
        SpaceForce => (4_544_268, "Space Force"),
        ArmyNationalGuard => (4075, "Army National Guard"),
        ArmyReserve => (4076, "Army Reserve"),
        AirNationalGuard => (4079, "Air National Guard"),
        AirForceReserve => (4080, "Air Force Reserve"),
        NavyReserve => (4078, "Navy Reserve"),
        MarineCorpsReserve => (4077, "Marine Corps Forces Reserve"),
        CoastGuardReserve => (4081, "Coast Guard Reserve"),
    };
    Organization { id, name }
}
