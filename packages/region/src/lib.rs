#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory store of user-selected regions.
//!
//! A [`RegionStore`] is an explicitly owned value: each session (or test)
//! creates its own and passes it by reference to the statistics client,
//! the insight batcher and the overlay projector. Metric fetches for
//! separately drawn regions may complete concurrently, so the store uses
//! interior locking and every mutation is keyed by region id.

pub mod geometry;
pub mod store;

pub use forest_watch_region_models::{LatLng, RegionId, RegionMetrics, RegionRecord};
pub use store::{AttachOutcome, RegionStore};

use thiserror::Error;

/// Errors that can occur when adding a region.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegionError {
    /// The polygon has fewer than three distinct vertices.
    #[error("Polygon needs at least 3 vertices, got {count}")]
    TooFewVertices {
        /// Number of distinct vertices supplied.
        count: usize,
    },

    /// A vertex is outside the WGS84 range or not a finite number.
    #[error("Invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate {
        /// Latitude of the offending vertex.
        lat: f64,
        /// Longitude of the offending vertex.
        lng: f64,
    },
}
