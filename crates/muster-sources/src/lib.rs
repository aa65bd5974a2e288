//! # muster-sources — Public veteran-record search adapters
//!
//! Three independent public endpoints, each behind the [`SourceAdapter`]
//! trait:
//!
//! | Source id | Adapter |
//! |-----------|---------|
//! | `grave_locator` | [`GraveLocatorAdapter`] |
//! | `vlm` | [`LegacyMemorialAdapter`] |
//! | `army_explorer` | [`CemeteryExplorerAdapter`] |
//!
//! Adapters only fetch and map. Caching, concurrency and merging live in
//! `muster-engine`.

pub mod adapter;
pub mod cemetery_explorer;
pub mod config;
pub mod error;
pub mod grave_locator;
pub mod legacy_memorial;
pub mod mock;

use std::sync::Arc;

pub use adapter::SourceAdapter;
pub use cemetery_explorer::CemeteryExplorerAdapter;
pub use config::{ConfigError, SourcesConfig};
pub use error::SourceError;
pub use grave_locator::GraveLocatorAdapter;
pub use legacy_memorial::LegacyMemorialAdapter;
pub use mock::MockSourceAdapter;

use muster_core::RecordSource;

/// Identifies this client to the public endpoints.
pub const USER_AGENT: &str = concat!("muster/", env!("CARGO_PKG_VERSION"));

/// Build one HTTP adapter per source, sharing a single connection pool.
pub fn build_adapters(config: &SourcesConfig) -> Result<Vec<Arc<dyn SourceAdapter>>, SourceError> {
    let http = reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(USER_AGENT)
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                reqwest::header::HeaderValue::from_static("application/json"),
            );
            headers
        })
        .build()
        .map_err(SourceError::ClientInit)?;

    Ok(RecordSource::ALL
        .into_iter()
        .map(|source| -> Arc<dyn SourceAdapter> {
            let base = config.base(source);
            match source {
                RecordSource::GraveLocator => Arc::new(GraveLocatorAdapter::new(http.clone(), base)),
                RecordSource::LegacyMemorial => Arc::new(LegacyMemorialAdapter::new(http.clone(), base)),
                RecordSource::CemeteryExplorer => {
                    Arc::new(CemeteryExplorerAdapter::new(http.clone(), base))
                }
            }
        })
        .collect())
}
