//! # Personal Records
//!
//! The identity attributes a subject submits for verification, and the
//! closed vocabularies (branch, service status, document type) they use.
//!
//! A [`PersonalRecord`] is immutable once it has been handed to the provider;
//! resubmission reuses the stored record instead of creating a new one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum length accepted for a first or last name.
pub const MAX_NAME_LEN: usize = 100;

// ─── Branch ──────────────────────────────────────────────────────────

/// Branch of service, serialized by display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MilitaryBranch {
    #[serde(rename = "Army")]
    Army,
    #[serde(rename = "Navy")]
    Navy,
    #[serde(rename = "Air Force")]
    AirForce,
    #[serde(rename = "Marine Corps")]
    MarineCorps,
    #[serde(rename = "Coast Guard")]
    CoastGuard,
    #[serde(rename = "Space Force")]
    SpaceForce,
    #[serde(rename = "Army National Guard")]
    ArmyNationalGuard,
    #[serde(rename = "Army Reserve")]
    ArmyReserve,
    #[serde(rename = "Air National Guard")]
    AirNationalGuard,
    #[serde(rename = "Air Force Reserve")]
    AirForceReserve,
    #[serde(rename = "Navy Reserve")]
    NavyReserve,
    #[serde(rename = "Marine Corps Reserve")]
    MarineCorpsReserve,
    #[serde(rename = "Coast Guard Reserve")]
    CoastGuardReserve,
}

impl MilitaryBranch {
    /// Every branch, in declaration order.
    pub const ALL: [MilitaryBranch; 13] = [
        Self::Army,
        Self::Navy,
        Self::AirForce,
        Self::MarineCorps,
        Self::CoastGuard,
        Self::SpaceForce,
        Self::ArmyNationalGuard,
        Self::ArmyReserve,
        Self::AirNationalGuard,
        Self::AirForceReserve,
        Self::NavyReserve,
        Self::MarineCorpsReserve,
        Self::CoastGuardReserve,
    ];

    /// Human-readable name, identical to the serde representation.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Army => "Army",
            Self::Navy => "Navy",
            Self::AirForce => "Air Force",
            Self::MarineCorps => "Marine Corps",
            Self::CoastGuard => "Coast Guard",
            Self::SpaceForce => "Space Force",
            Self::ArmyNationalGuard => "Army National Guard",
            Self::ArmyReserve => "Army Reserve",
            Self::AirNationalGuard => "Air National Guard",
            Self::AirForceReserve => "Air Force Reserve",
            Self::NavyReserve => "Navy Reserve",
            Self::MarineCorpsReserve => "Marine Corps Reserve",
            Self::CoastGuardReserve => "Coast Guard Reserve",
        }
    }

    /// Map free-text input to a branch.
    ///
    /// Exact (case-insensitive) display-name matches win; otherwise keyword
    /// heuristics apply in a fixed order. A leading `US ` is ignored.
    /// Unrecognised input falls back to [`MilitaryBranch::Army`].
    pub fn normalize(input: &str) -> Self {
        let upper = input.to_uppercase();
        let normalized = upper.replace("US ", "");
        let normalized = normalized.trim();

        if let Some(branch) = Self::ALL
            .into_iter()
            .find(|b| b.display_name().to_uppercase() == normalized)
        {
            return branch;
        }

        let has = |needle: &str| normalized.contains(needle);
        if has("MARINE") && !has("RESERVE") {
            Self::MarineCorps
        } else if has("MARINE") {
            Self::MarineCorpsReserve
        } else if has("ARMY") && has("NATIONAL") {
            Self::ArmyNationalGuard
        } else if has("ARMY") && has("RESERVE") {
            Self::ArmyReserve
        } else if has("ARMY") {
            Self::Army
        } else if has("NAVY") && has("RESERVE") {
            Self::NavyReserve
        } else if has("NAVY") {
            Self::Navy
        } else if has("AIR") && has("NATIONAL") {
            Self::AirNationalGuard
        } else if has("AIR") && has("RESERVE") {
            Self::AirForceReserve
        } else if has("AIR") {
            Self::AirForce
        } else if has("COAST") && has("RESERVE") {
            Self::CoastGuardReserve
        } else if has("COAST") {
            Self::CoastGuard
        } else if has("SPACE") {
            Self::SpaceForce
        } else {
            Self::Army
        }
    }
}

impl std::fmt::Display for MilitaryBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─── Service status ──────────────────────────────────────────────────

/// Service status of the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilitaryStatus {
    ActiveDuty,
    #[default]
    Veteran,
    Reserve,
    Retired,
}

impl MilitaryStatus {
    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActiveDuty => "ACTIVE_DUTY",
            Self::Veteran => "VETERAN",
            Self::Reserve => "RESERVE",
            Self::Retired => "RETIRED",
        }
    }
}

// ─── Documents ───────────────────────────────────────────────────────

/// Kind of supporting document uploaded when the provider asks for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Certificate of release or discharge from active duty.
    #[serde(rename = "DD214")]
    Dd214,
    MilitaryId,
    VaCard,
    Other,
}

impl DocumentType {
    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dd214 => "DD214",
            Self::MilitaryId => "MILITARY_ID",
            Self::VaCard => "VA_CARD",
            Self::Other => "OTHER",
        }
    }
}

// ─── Record ──────────────────────────────────────────────────────────

/// Validation failures for a [`PersonalRecord`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field} exceeds the maximum name length")]
    FieldTooLong { field: &'static str },

    #[error("discharge date {discharge} precedes birth date {birth}")]
    DischargeBeforeBirth { birth: NaiveDate, discharge: NaiveDate },
}

/// Subject attributes submitted for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub record_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub branch: MilitaryBranch,
    #[serde(default)]
    pub military_status: MilitaryStatus,
    #[serde(default)]
    pub discharge_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl PersonalRecord {
    /// Create a record with a fresh id and default `VETERAN` status.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        branch: MilitaryBranch,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date: None,
            branch,
            military_status: MilitaryStatus::default(),
            discharge_date: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_birth_date(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    pub fn with_status(mut self, status: MilitaryStatus) -> Self {
        self.military_status = status;
        self
    }

    pub fn with_discharge_date(mut self, date: NaiveDate) -> Self {
        self.discharge_date = Some(date);
        self
    }

    /// `"First Last"`, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Check name bounds and date ordering.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(RecordError::EmptyField { field });
            }
            if trimmed.chars().count() > MAX_NAME_LEN {
                return Err(RecordError::FieldTooLong { field });
            }
        }
        if let (Some(birth), Some(discharge)) = (self.birth_date, self.discharge_date) {
            if discharge < birth {
                return Err(RecordError::DischargeBeforeBirth { birth, discharge });
            }
        }
        Ok(())
    }
}
