//! Server configuration from environment variables and an optional TOML
//! file.
//!
//! `FOREST_WATCH_CONFIG` points at a file with optional `[statistics]`
//! and `[calibration]` tables; anything not given falls back to the
//! embedded defaults.

use std::path::Path;
use std::time::Duration;

use forest_watch_analysis::StatisticsConfig;
use forest_watch_overlay::Calibration;
use serde::Deserialize;

use crate::ServerError;

/// Environment variable naming the TOML configuration file.
pub const CONFIG_ENV: &str = "FOREST_WATCH_CONFIG";

/// Default port; the insight proxy has always listened on 3000.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bound on one generative call, in seconds.
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;

/// File-backed configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Statistics service connection.
    pub statistics: StatisticsConfig,
    /// Conversion factors for overlays and summaries.
    pub calibration: Calibration,
}

impl AppConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the TOML is invalid.
    pub fn from_toml(text: &str) -> Result<Self, ServerError> {
        toml::de::from_str(text).map_err(|e| ServerError::Config {
            message: e.to_string(),
        })
    }

    /// Reads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the file cannot be read or
    /// parsed.
    pub fn from_path(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&text)
    }

    /// Loads the file named by `FOREST_WATCH_CONFIG`, or the defaults
    /// when it is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the named file is unusable.
    pub fn from_env() -> Result<Self, ServerError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                log::info!("Loading configuration from {path}");
                Self::from_path(Path::new(&path))
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Bind address and port from `BIND_ADDR` and `PORT`.
#[must_use]
pub fn bind_from_env() -> (String, u16) {
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    (bind_addr, port)
}

/// Generative call timeout from `AI_TIMEOUT_SECS`.
#[must_use]
pub fn ai_timeout_from_env() -> Duration {
    let secs = std::env::var("AI_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&s: &u64| s > 0)
        .unwrap_or(DEFAULT_AI_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn tables_override_independently() {
        let config = AppConfig::from_toml(
            r#"
[statistics]
base_url = "http://localhost:9000/analyze_region"
concurrent_requests = 8

[calibration]
co2_per_carbon = 3.664
"#,
        )
        .unwrap();

        assert_eq!(
            config.statistics.base_url,
            "http://localhost:9000/analyze_region"
        );
        assert_eq!(config.statistics.concurrent_requests, 8);
        assert_eq!(config.statistics.timeout_secs, 60);
        assert_eq!(config.calibration.co2_per_carbon, 3.664);
        assert_eq!(config.calibration.hectares_per_pixel, 0.09);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        assert!(matches!(
            AppConfig::from_toml("[calibration\n"),
            Err(ServerError::Config { .. })
        ));
    }
}
