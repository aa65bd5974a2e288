//! # Public-Record Lookups
//!
//! Types shared by the source adapters, the lookup cache and the
//! aggregator:
//!
//! - [`LookupQuery`]: a validated search with a normalized cache key.
//! - [`LookupResult`]: one matched record from one source.
//! - [`CacheEntry`]: a stored result set with an expiry.
//! - [`LookupResponse`] / [`AggregateResponse`]: payloads handed to
//!   presentation layers.
//!
//! Results are grouped by source only. Two sources reporting the same
//! person produce two results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::MilitaryBranch;

// ─── Sources ─────────────────────────────────────────────────────────

/// Identity of a public-record source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordSource {
    /// National gravesite locator.
    #[serde(rename = "grave_locator")]
    GraveLocator,
    /// Veterans legacy memorial.
    #[serde(rename = "vlm")]
    LegacyMemorial,
    /// Army national cemetery explorer.
    #[serde(rename = "army_explorer")]
    CemeteryExplorer,
}

impl RecordSource {
    pub const ALL: [RecordSource; 3] = [
        Self::GraveLocator,
        Self::LegacyMemorial,
        Self::CemeteryExplorer,
    ];

    /// Stable identifier used in cache keys and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GraveLocator => "grave_locator",
            Self::LegacyMemorial => "vlm",
            Self::CemeteryExplorer => "army_explorer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|src| src.as_str() == s.trim())
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Query ───────────────────────────────────────────────────────────

/// Raised when a lookup carries no search terms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("at least one of first_name or last_name is required")]
pub struct InvalidQuery;

/// Lowercase and collapse runs of whitespace to a single space.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// A validated public-record search.
///
/// Name fields keep their case (sources receive them as typed) but have
/// surrounding and repeated whitespace removed. Two queries are
/// cache-equivalent iff their [`cache_key`](Self::cache_key)s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupQuery {
    first_name: Option<String>,
    last_name: Option<String>,
    branch: Option<MilitaryBranch>,
    state: Option<String>,
}

impl LookupQuery {
    /// Build a query; fails if both names are missing or blank.
    pub fn new(first_name: Option<&str>, last_name: Option<&str>) -> Result<Self, InvalidQuery> {
        let first_name = collapse(first_name);
        let last_name = collapse(last_name);
        if first_name.is_none() && last_name.is_none() {
            return Err(InvalidQuery);
        }
        Ok(Self {
            first_name,
            last_name,
            branch: None,
            state: None,
        })
    }

    pub fn with_branch(mut self, branch: Option<MilitaryBranch>) -> Self {
        self.branch = branch;
        self
    }

    /// Restrict to a state / territory code (e.g. `CA`).
    pub fn with_state(mut self, state: Option<&str>) -> Self {
        self.state = collapse(state).map(|s| s.to_uppercase());
        self
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn branch(&self) -> Option<MilitaryBranch> {
        self.branch
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// `"First Last"` as typed, used as the payload's `query` field.
    pub fn display(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Normalized key: `first last[|branch=…][|state=…]`, all lowercase.
    pub fn cache_key(&self) -> String {
        let mut key = normalize_name(&self.display());
        if let Some(branch) = self.branch {
            key.push_str("|branch=");
            key.push_str(&normalize_name(branch.display_name()));
        }
        if let Some(state) = &self.state {
            key.push_str("|state=");
            key.push_str(&normalize_name(state));
        }
        key
    }
}

// ─── Results ─────────────────────────────────────────────────────────

/// One matched record from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub source: RecordSource,
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub death_date: Option<String>,
    #[serde(default)]
    pub cemetery: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub service_dates: Option<String>,
    #[serde(default)]
    pub awards: Option<Vec<String>>,
    /// The raw source record, kept verbatim for debugging.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl LookupResult {
    pub fn new(source: RecordSource, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            branch: None,
            rank: None,
            birth_date: None,
            death_date: None,
            cemetery: None,
            location: None,
            service_dates: None,
            awards: None,
            metadata: serde_json::Value::Null,
        }
    }
}

/// A stored result set for one `(source, cache key)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source: RecordSource,
    pub query_key: String,
    pub results: Vec<LookupResult>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry is dead from its expiry instant onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// ─── Payloads ────────────────────────────────────────────────────────

/// Result payload for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub query: String,
    #[serde(default)]
    pub source: Option<RecordSource>,
    pub total_results: usize,
    pub results: Vec<LookupResult>,
    pub cached: bool,
}

impl LookupResponse {
    pub fn new(
        query: impl Into<String>,
        source: Option<RecordSource>,
        results: Vec<LookupResult>,
        cached: bool,
    ) -> Self {
        Self {
            query: query.into(),
            source,
            total_results: results.len(),
            results,
            cached,
        }
    }
}

/// Result payload across every configured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub query: String,
    pub total_results: usize,
    pub sources: BTreeMap<RecordSource, LookupResponse>,
}

impl AggregateResponse {
    /// Assemble the aggregate; `total_results` is the per-source sum.
    pub fn from_sources(
        query: impl Into<String>,
        sources: BTreeMap<RecordSource, LookupResponse>,
    ) -> Self {
        let total_results = sources.values().map(|r| r.total_results).sum();
        Self {
            query: query.into(),
            total_results,
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_and_lowercase_queries_share_a_key() {
        assert_eq!(normalize_name(" John  Doe "), normalize_name("john doe"));
        let a = LookupQuery::new(Some(" John "), Some("  Doe")).unwrap();
        let b = LookupQuery::new(Some("john"), Some("doe")).unwrap();
        assert_eq!(a.cache_key(), "john doe");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn display_keeps_case_and_drops_missing_parts() {
        let q = LookupQuery::new(None, Some(" Smith ")).unwrap();
        assert_eq!(q.display(), "Smith");
        assert_eq!(q.first_name(), None);
        let q = LookupQuery::new(Some("Mary  Ann"), Some("Smith")).unwrap();
        assert_eq!(q.display(), "Mary Ann Smith");
    }

    #[test]
    fn blank_names_are_invalid() {
        assert_eq!(LookupQuery::new(None, None), Err(InvalidQuery));
        assert_eq!(LookupQuery::new(Some("  "), Some("")), Err(InvalidQuery));
    }

    #[test]
    fn discriminators_extend_the_key() {
        let base = LookupQuery::new(Some("Jane"), Some("Smith")).unwrap();
        let branched = base
            .clone()
            .with_branch(Some(MilitaryBranch::AirForce))
            .with_state(Some(" ca "));
        assert_eq!(branched.cache_key(), "jane smith|branch=air force|state=ca");
        assert_eq!(branched.state(), Some("CA"));
        assert_ne!(base.cache_key(), branched.cache_key());
    }

    #[test]
    fn source_ids_round_trip() {
        for source in RecordSource::ALL {
            assert_eq!(RecordSource::parse(source.as_str()), Some(source));
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.as_str()));
        }
        assert_eq!(RecordSource::parse("ancestry"), None);
    }

    #[test]
    fn cache_entry_expires_at_boundary() {
        let now = Utc::now();
        let entry = CacheEntry {
            source: RecordSource::GraveLocator,
            query_key: "john doe".into(),
            results: vec![],
            cached_at: now,
            expires_at: now,
        };
        assert!(entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn aggregate_total_is_sum_of_sources() {
        let mut sources = BTreeMap::new();
        sources.insert(
            RecordSource::GraveLocator,
            LookupResponse::new(
                "Jane Smith",
                Some(RecordSource::GraveLocator),
                vec![
                    LookupResult::new(RecordSource::GraveLocator, "Jane Smith"),
                    LookupResult::new(RecordSource::GraveLocator, "Jane A Smith"),
                ],
                false,
            ),
        );
        sources.insert(
            RecordSource::LegacyMemorial,
            LookupResponse::new("Jane Smith", Some(RecordSource::LegacyMemorial), vec![], false),
        );
        let agg = AggregateResponse::from_sources("Jane Smith", sources);
        assert_eq!(agg.total_results, 2);

        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json["sources"]["grave_locator"]["total_results"], 2);
        assert_eq!(json["sources"]["vlm"]["cached"], false);
    }
}
