//! # Multi-Source Lookup Aggregator
//!
//! Fans one query out to every configured source concurrently, consults the
//! [`LookupCache`] per source, and merges the answers into an
//! [`AggregateResponse`].
//!
//! ## Failure isolation
//!
//! Each source runs in its own spawned task. A transport error, a timeout or
//! a panic in one source yields an empty, uncached result set for that
//! source and never affects the others.
//!
//! ## Determinism
//!
//! Sources are keyed in a `BTreeMap`, so the serialized payload lists them in
//! the same order regardless of which task finished first.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use muster_core::{
    AggregateResponse, LookupQuery, LookupResponse, LookupResult, MilitaryBranch, RecordSource,
};
use muster_sources::SourceAdapter;

use crate::cache::LookupCache;
use crate::error::LookupError;

/// Upper bound on one source call, on top of any client-level timeout.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Concurrent fan-out over the configured sources.
#[derive(Clone)]
pub struct LookupAggregator {
    adapters: BTreeMap<RecordSource, Arc<dyn SourceAdapter>>,
    cache: LookupCache,
    source_timeout: Duration,
}

impl std::fmt::Debug for LookupAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupAggregator")
            .field("sources", &self.adapters.keys().collect::<Vec<_>>())
            .field("cache", &self.cache)
            .field("source_timeout", &self.source_timeout)
            .finish()
    }
}

impl LookupAggregator {
    /// Later adapters for the same source replace earlier ones.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, cache: LookupCache) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.source(), a)).collect(),
            cache,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Configured sources, in key order.
    pub fn sources(&self) -> Vec<RecordSource> {
        self.adapters.keys().copied().collect()
    }

    /// Search every source by name, optionally narrowed by branch.
    ///
    /// Fails only when both names are blank.
    pub async fn search_all(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
        branch: Option<MilitaryBranch>,
        use_cache: bool,
    ) -> Result<AggregateResponse, LookupError> {
        let query = LookupQuery::new(first_name, last_name)?.with_branch(branch);
        Ok(self.search_query(&query, use_cache).await)
    }

    /// Search every source with an already-validated query.
    pub async fn search_query(&self, query: &LookupQuery, use_cache: bool) -> AggregateResponse {
        let tasks: Vec<(RecordSource, tokio::task::JoinHandle<LookupResponse>)> = self
            .adapters
            .iter()
            .map(|(source, adapter)| {
                let adapter = Arc::clone(adapter);
                let cache = self.cache.clone();
                let query = query.clone();
                let timeout = self.source_timeout;
                let handle = tokio::spawn(async move {
                    lookup_one(adapter.as_ref(), &cache, &query, use_cache, timeout).await
                });
                (*source, handle)
            })
            .collect();

        let mut sources = BTreeMap::new();
        for (source, handle) in tasks {
            let response = match handle.await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(%source, "source task failed: {e}");
                    LookupResponse::new(query.display(), Some(source), Vec::new(), false)
                }
            };
            sources.insert(source, response);
        }

        let aggregate = AggregateResponse::from_sources(query.display(), sources);
        tracing::info!(
            query = %aggregate.query,
            total_results = aggregate.total_results,
            use_cache,
            "aggregate lookup complete"
        );
        aggregate
    }

    /// Search one source.
    pub async fn search_source(
        &self,
        source: RecordSource,
        query: &LookupQuery,
        use_cache: bool,
    ) -> Result<LookupResponse, LookupError> {
        let adapter = self
            .adapters
            .get(&source)
            .ok_or(LookupError::SourceNotConfigured(source))?;
        Ok(lookup_one(adapter.as_ref(), &self.cache, query, use_cache, self.source_timeout).await)
    }
}

/// Cache, then network, then cache write-back, for one source.
///
/// With `use_cache` off the cache is neither read nor written.
async fn lookup_one(
    adapter: &dyn SourceAdapter,
    cache: &LookupCache,
    query: &LookupQuery,
    use_cache: bool,
    timeout: Duration,
) -> LookupResponse {
    let source = adapter.source();

    if use_cache {
        if let Some(entry) = cache.get(source, query).await {
            tracing::info!(%source, key = %entry.query_key, "serving cached lookup results");
            return LookupResponse::new(query.display(), Some(source), entry.results, true);
        }
    }

    let results: Vec<LookupResult> = match tokio::time::timeout(timeout, adapter.search(query)).await {
        Ok(Ok(results)) => {
            if use_cache {
                cache.put(source, query, &results).await;
            }
            results
        }
        Ok(Err(e)) => {
            tracing::error!(%source, "source search failed: {e}");
            Vec::new()
        }
        Err(_) => {
            tracing::error!(%source, timeout_ms = timeout.as_millis() as u64, "source search timed out");
            Vec::new()
        }
    };

    LookupResponse::new(query.display(), Some(source), results, false)
}
