//! Dependency bundle built once at startup and shared by every request.

use std::sync::Arc;

use muster_core::Repository;
use muster_provider::{HttpVerificationProvider, ProviderConfig, VerificationProvider};
use muster_sources::{build_adapters, SourceAdapter, SourcesConfig};

use crate::aggregator::LookupAggregator;
use crate::cache::{CacheConfig, LookupCache};
use crate::driver::{DriverConfig, VerificationDriver};
use crate::error::EngineError;

/// All configuration the engine reads from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub provider: ProviderConfig,
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        Ok(Self {
            provider: ProviderConfig::from_env()?,
            sources: SourcesConfig::from_env()?,
            cache: CacheConfig::from_env()?,
        })
    }
}

/// The driver, the aggregator and the repository they share. Cheap to clone.
#[derive(Clone)]
pub struct Services {
    pub driver: VerificationDriver,
    pub lookups: LookupAggregator,
    pub repository: Arc<dyn Repository>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("driver", &self.driver)
            .field("lookups", &self.lookups)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Wire HTTP clients for the provider and every source.
    pub fn from_config(config: &EngineConfig, repository: Arc<dyn Repository>) -> Result<Self, EngineError> {
        let provider = Arc::new(HttpVerificationProvider::new(&config.provider)?);
        let adapters = build_adapters(&config.sources)?;
        let mut services = Self::from_parts(
            provider,
            adapters,
            repository,
            DriverConfig::from_provider(&config.provider),
            config.cache,
        );
        services.lookups = services.lookups.with_source_timeout(config.sources.timeout());
        Ok(services)
    }

    /// Wire explicit collaborators (tests, alternative transports).
    pub fn from_parts(
        provider: Arc<dyn VerificationProvider>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        repository: Arc<dyn Repository>,
        driver_config: DriverConfig,
        cache_config: CacheConfig,
    ) -> Self {
        let cache = LookupCache::new(Arc::clone(&repository), cache_config);
        Self {
            driver: VerificationDriver::new(provider, Arc::clone(&repository), driver_config),
            lookups: LookupAggregator::new(adapters, cache),
            repository,
        }
    }
}
