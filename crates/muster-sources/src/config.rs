//! Public-record source configuration.
//!
//! Defaults point at the public production endpoints. Override via
//! environment variables or explicit construction for testing.

use std::time::Duration;

use url::Url;

use muster_core::RecordSource;

pub const DEFAULT_GRAVE_LOCATOR_URL: &str = "https://gravelocator.cem.va.gov";
pub const DEFAULT_VLM_URL: &str = "https://www.vlm.cem.va.gov";
pub const DEFAULT_ARMY_EXPLORER_URL: &str = "https://ancexplorer.army.mil";

/// Base URLs and timeout for the three sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesConfig {
    pub grave_locator_url: Url,
    pub vlm_url: Url,
    pub army_explorer_url: Url,
    /// Per-request timeout in seconds, applied to every source.
    pub timeout_secs: u64,
}

impl SourcesConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MUSTER_GRAVE_LOCATOR_URL` (default: `https://gravelocator.cem.va.gov`)
    /// - `MUSTER_VLM_URL` (default: `https://www.vlm.cem.va.gov`)
    /// - `MUSTER_ARMY_EXPLORER_URL` (default: `https://ancexplorer.army.mil`)
    /// - `MUSTER_SOURCE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = |var: &str, default: &str| -> Result<Url, ConfigError> {
            let raw = lookup(var).unwrap_or_else(|| default.to_string());
            Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
        };
        Ok(Self {
            grave_locator_url: url("MUSTER_GRAVE_LOCATOR_URL", DEFAULT_GRAVE_LOCATOR_URL)?,
            vlm_url: url("MUSTER_VLM_URL", DEFAULT_VLM_URL)?,
            army_explorer_url: url("MUSTER_ARMY_EXPLORER_URL", DEFAULT_ARMY_EXPLORER_URL)?,
            timeout_secs: lookup("MUSTER_SOURCE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Point every source at one local mock server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base_url` cannot be parsed.
    pub fn local_mock(base_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl("local_mock".to_string(), e.to_string()))?;
        Ok(Self {
            grave_locator_url: url.clone(),
            vlm_url: url.clone(),
            army_explorer_url: url,
            timeout_secs: 5,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL of `source`, without a trailing slash.
    pub fn base(&self, source: RecordSource) -> String {
        let url = match source {
            RecordSource::GraveLocator => &self.grave_locator_url,
            RecordSource::LegacyMemorial => &self.vlm_url,
            RecordSource::CemeteryExplorer => &self.army_explorer_url,
        };
        url.as_str().trim_end_matches('/').to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_endpoints() {
        let cfg = SourcesConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.base(RecordSource::GraveLocator), DEFAULT_GRAVE_LOCATOR_URL);
        assert_eq!(cfg.base(RecordSource::LegacyMemorial), DEFAULT_VLM_URL);
        assert_eq!(cfg.base(RecordSource::CemeteryExplorer), DEFAULT_ARMY_EXPLORER_URL);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn overrides_and_bad_urls() {
        let cfg = SourcesConfig::from_lookup(|var| match var {
            "MUSTER_VLM_URL" => Some("http://127.0.0.1:8080/".into()),
            "MUSTER_SOURCE_TIMEOUT_SECS" => Some("7".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.base(RecordSource::LegacyMemorial), "http://127.0.0.1:8080");
        assert_eq!(cfg.timeout_secs, 7);

        let err = SourcesConfig::from_lookup(|var| {
            (var == "MUSTER_GRAVE_LOCATOR_URL").then(|| "::nope".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("MUSTER_GRAVE_LOCATOR_URL"));
    }

    #[test]
    fn local_mock_shares_one_base() {
        let cfg = SourcesConfig::local_mock("http://127.0.0.1:9100").unwrap();
        for source in RecordSource::ALL {
            assert_eq!(cfg.base(source), "http://127.0.0.1:9100");
        }
    }
}
