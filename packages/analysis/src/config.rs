//! Statistics service configuration.

use std::path::Path;

use serde::Deserialize;

use crate::AnalysisError;

/// Default configuration, embedded at compile time.
const DEFAULT_TOML: &str = include_str!("../services/statistics.toml");

/// Connection settings for the statistics service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatisticsConfig {
    /// Full URL of the `analyze_region` endpoint.
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum number of regions analyzed concurrently.
    #[serde(default = "default_concurrent")]
    pub concurrent_requests: usize,
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_concurrent() -> usize {
    4
}

impl Default for StatisticsConfig {
    /// Returns the embedded configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (a compile-time
    /// guarantee since the file is embedded).
    fn default() -> Self {
        toml::de::from_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded statistics config: {e}"))
    }
}

impl StatisticsConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] if the TOML is invalid.
    pub fn from_toml(text: &str) -> Result<Self, AnalysisError> {
        toml::de::from_str(text).map_err(|e| AnalysisError::Config {
            message: e.to_string(),
        })
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] if the file cannot be read or
    /// parsed.
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path).map_err(|e| AnalysisError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_parses() {
        let config = StatisticsConfig::default();
        assert!(config.base_url.ends_with("/analyze_region"));
        assert!(config.timeout_secs > 0);
        assert!(config.concurrent_requests > 0);
    }

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let config = StatisticsConfig::from_toml(r#"base_url = "http://localhost:9000""#).unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.concurrent_requests, 4);
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        assert!(matches!(
            StatisticsConfig::from_toml("timeout_secs = 5"),
            Err(AnalysisError::Config { .. })
        ));
    }
}
