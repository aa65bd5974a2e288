//! # Lookup Cache
//!
//! Per-source, TTL-bounded cache of lookup results, keyed by
//! `(source, normalized query key)` and stored through the [`Repository`].
//!
//! - Expiry is checked at read time: an entry is never served at or after
//!   its `expires_at`.
//! - `put` replaces; result sets are never merged.
//! - Repository failures degrade to a miss (reads) or a no-op (writes).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use muster_core::{CacheEntry, LookupQuery, LookupResult, RecordSource, Repository};

use crate::error::EngineError;

/// Default positive TTL: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of a non-empty result set.
    pub ttl: Duration,
    /// Lifetime of an empty result set. `None` disables negative caching.
    pub negative_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            negative_ttl: None,
        }
    }
}

impl CacheConfig {
    /// Variables:
    /// - `MUSTER_CACHE_TTL_SECS` (default: 86400)
    /// - `MUSTER_CACHE_NEGATIVE_TTL_SECS` (unset: no negative caching)
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |var: &'static str| -> Result<Option<Duration>, EngineError> {
            lookup(var)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|e| EngineError::CacheConfig {
                            var,
                            reason: e.to_string(),
                        })
                })
                .transpose()
        };
        Ok(Self {
            ttl: secs("MUSTER_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_TTL),
            negative_ttl: secs("MUSTER_CACHE_NEGATIVE_TTL_SECS")?,
        })
    }

    /// TTL for a result set of this size, or `None` if it must not be cached.
    pub fn ttl_for(&self, results: &[LookupResult]) -> Option<Duration> {
        if results.is_empty() {
            self.negative_ttl
        } else {
            Some(self.ttl)
        }
    }
}

/// Repository-backed lookup cache. Cheap to clone.
#[derive(Clone)]
pub struct LookupCache {
    repo: Arc<dyn Repository>,
    config: CacheConfig,
}

impl std::fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LookupCache {
    pub fn new(repo: Arc<dyn Repository>, config: CacheConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Live entry for `(source, query)`, if any.
    pub async fn get(&self, source: RecordSource, query: &LookupQuery) -> Option<CacheEntry> {
        let key = query.cache_key();
        match self.repo.get_cache(source, &key).await {
            Ok(Some(entry)) if !entry.is_expired_at(Utc::now()) => Some(entry),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(%source, key = %key, "cache read failed, treating as miss: {e}");
                None
            }
        }
    }

    /// Store `results` for `(source, query)`, replacing any previous entry.
    ///
    /// Empty result sets are stored only when negative caching is enabled.
    /// Returns whether a row was written.
    pub async fn put(&self, source: RecordSource, query: &LookupQuery, results: &[LookupResult]) -> bool {
        let Some(ttl) = self.config.ttl_for(results) else {
            return false;
        };
        let key = query.cache_key();
        match self.repo.put_cache(source, &key, results, ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%source, key = %key, "cache write failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::InMemoryRepository;

    fn query() -> LookupQuery {
        LookupQuery::new(Some("John"), Some("Doe")).unwrap()
    }

    fn cache(repo: &InMemoryRepository, config: CacheConfig) -> LookupCache {
        LookupCache::new(Arc::new(repo.clone()), config)
    }

    #[tokio::test]
    async fn round_trip_within_ttl() {
        let repo = InMemoryRepository::new();
        let cache = cache(&repo, CacheConfig::default());
        let results = vec![LookupResult::new(RecordSource::GraveLocator, "John Doe")];

        assert!(cache.put(RecordSource::GraveLocator, &query(), &results).await);
        let entry = cache.get(RecordSource::GraveLocator, &query()).await.unwrap();
        assert_eq!(entry.results, results);
        assert!(cache.get(RecordSource::LegacyMemorial, &query()).await.is_none());
    }

    #[tokio::test]
    async fn equivalent_queries_share_entries() {
        let repo = InMemoryRepository::new();
        let cache = cache(&repo, CacheConfig::default());
        let results = vec![LookupResult::new(RecordSource::GraveLocator, "John Doe")];
        cache.put(RecordSource::GraveLocator, &query(), &results).await;

        let padded = LookupQuery::new(Some(" JOHN "), Some("doe  ")).unwrap();
        assert!(cache.get(RecordSource::GraveLocator, &padded).await.is_some());
    }

    #[tokio::test]
    async fn zero_ttl_entry_is_never_served() {
        let repo = InMemoryRepository::new();
        let cache = cache(
            &repo,
            CacheConfig {
                ttl: Duration::ZERO,
                negative_ttl: None,
            },
        );
        let results = vec![LookupResult::new(RecordSource::GraveLocator, "John Doe")];
        assert!(cache.put(RecordSource::GraveLocator, &query(), &results).await);
        assert!(cache.get(RecordSource::GraveLocator, &query()).await.is_none());
    }

    #[tokio::test]
    async fn empty_results_need_negative_ttl() {
        let repo = InMemoryRepository::new();
        let off = cache(&repo, CacheConfig::default());
        assert!(!off.put(RecordSource::GraveLocator, &query(), &[]).await);
        assert_eq!(repo.write_count(), 0);

        let on = cache(
            &repo,
            CacheConfig {
                ttl: DEFAULT_TTL,
                negative_ttl: Some(Duration::from_secs(60)),
            },
        );
        assert!(on.put(RecordSource::GraveLocator, &query(), &[]).await);
        let entry = on.get(RecordSource::GraveLocator, &query()).await.unwrap();
        assert!(entry.results.is_empty());
    }

    #[tokio::test]
    async fn repository_outage_is_a_miss() {
        let repo = InMemoryRepository::new();
        let cache = cache(&repo, CacheConfig::default());
        let results = vec![LookupResult::new(RecordSource::GraveLocator, "John Doe")];
        cache.put(RecordSource::GraveLocator, &query(), &results).await;

        repo.set_available(false);
        assert!(cache.get(RecordSource::GraveLocator, &query()).await.is_none());
        assert!(!cache.put(RecordSource::GraveLocator, &query(), &results).await);
    }

    #[test]
    fn config_from_lookup() {
        let cfg = CacheConfig::from_lookup(|var| match var {
            "MUSTER_CACHE_TTL_SECS" => Some("600".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.ttl, Duration::from_secs(600));
        assert_eq!(cfg.negative_ttl, None);

        let err = CacheConfig::from_lookup(|var| {
            (var == "MUSTER_CACHE_NEGATIVE_TTL_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("MUSTER_CACHE_NEGATIVE_TTL_SECS"));
    }
}
