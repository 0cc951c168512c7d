#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the external region statistics service.
//!
//! The service is stateless: it accepts a `GeoJSON` polygon and replies
//! with a JSON object of environmental metrics. A failed fetch never
//! aborts region selection; the region is kept with empty metrics and
//! the failure is reported alongside it as a [`MetricsOutcome::Failed`].
//!
//! The endpoint, timeout and fan-out are configured by
//! [`config::StatisticsConfig`], whose defaults are embedded from
//! `services/statistics.toml`.

pub mod client;
pub mod config;
pub mod selection;

pub use client::{MetricsOutcome, StatisticsClient};
pub use config::StatisticsConfig;

use thiserror::Error;

/// Errors from the statistics service.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// HTTP request failed (connection, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Statistics service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The response was not a JSON object.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
