#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map overlays and summary figures derived from region insights.
//!
//! Every restoration zone becomes a marker plus two nested circles.
//! Numeric conversions (pixels to hectares, carbon to CO2) go through a
//! [`Calibration`] so deployments on a different satellite product can
//! override the factors.

pub mod projector;
pub mod summary;

pub use projector::{CircleRole, OverlayPrimitive, Style, project};
pub use summary::{DashboardSummary, RegionFigures, summarize};

use serde::{Deserialize, Serialize};

/// Hectares covered by one forest-loss pixel (30 m Landsat pixel).
pub const HECTARES_PER_PIXEL: f64 = 0.09;

/// Mass ratio of CO2 to carbon (44 / 12, rounded).
pub const CO2_PER_CARBON: f64 = 3.67;

/// Inner "glow" circle radius in meters per kilometre of zone radius.
pub const INNER_RADIUS_M_PER_KM: f64 = 500.0;

/// Outer boundary circle radius in meters per kilometre of zone radius.
pub const OUTER_RADIUS_M_PER_KM: f64 = 1000.0;

/// Marker symbol scale per kilometre of zone radius.
pub const MARKER_SCALE_PER_KM: f64 = 2.0;

/// Conversion factors used by the projector and the dashboard summary.
///
/// Every field is optional when deserialized and falls back to the
/// constant of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// See [`HECTARES_PER_PIXEL`].
    pub hectares_per_pixel: f64,
    /// See [`CO2_PER_CARBON`].
    pub co2_per_carbon: f64,
    /// See [`INNER_RADIUS_M_PER_KM`].
    pub inner_radius_m_per_km: f64,
    /// See [`OUTER_RADIUS_M_PER_KM`].
    pub outer_radius_m_per_km: f64,
    /// See [`MARKER_SCALE_PER_KM`].
    pub marker_scale_per_km: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            hectares_per_pixel: HECTARES_PER_PIXEL,
            co2_per_carbon: CO2_PER_CARBON,
            inner_radius_m_per_km: INNER_RADIUS_M_PER_KM,
            outer_radius_m_per_km: OUTER_RADIUS_M_PER_KM,
            marker_scale_per_km: MARKER_SCALE_PER_KM,
        }
    }
}

impl Calibration {
    /// Forest loss in hectares for a pixel count.
    #[must_use]
    pub fn forest_loss_hectares(&self, pixels: f64) -> f64 {
        pixels * self.hectares_per_pixel
    }

    /// CO2-equivalent tons for a biomass density in MgC/ha.
    #[must_use]
    pub fn co2_tons(&self, biomass_mgc_ha: f64) -> f64 {
        biomass_mgc_ha * self.co2_per_carbon
    }

    /// Inner circle radius in meters.
    #[must_use]
    pub fn inner_radius_m(&self, radius_km: f64) -> f64 {
        radius_km * self.inner_radius_m_per_km
    }

    /// Outer circle radius in meters.
    #[must_use]
    pub fn outer_radius_m(&self, radius_km: f64) -> f64 {
        radius_km * self.outer_radius_m_per_km
    }

    /// Marker symbol scale.
    #[must_use]
    pub fn marker_scale(&self, radius_km: f64) -> f64 {
        radius_km * self.marker_scale_per_km
    }
}
