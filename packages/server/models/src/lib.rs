#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the forest watch server.
//!
//! These types are serialized to JSON for the REST API. They wrap the
//! domain types so the API contract can evolve separately.

use forest_watch_insight_models::InsightRecord;
use forest_watch_overlay::{DashboardSummary, OverlayPrimitive};
use forest_watch_region_models::{LatLng, RegionId, RegionMetrics, RegionRecord};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// JSON error body. `raw` carries the model text when the failure came
/// from an unusable reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// Raw model output, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ApiError {
    /// An error without raw text.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            raw: None,
        }
    }

    /// An error carrying raw model output.
    #[must_use]
    pub fn with_raw(error: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            raw: Some(raw.into()),
        }
    }
}

/// Body of `POST /api/regions`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddRegionRequest {
    /// Polygon vertices in drawing order.
    pub geometry: Vec<LatLng>,
}

/// A stored region as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRegion {
    /// The stored record.
    #[serde(flatten)]
    pub record: RegionRecord,
    /// `"north, west"` corner label shown after selection.
    pub bounds_label: String,
}

impl From<RegionRecord> for ApiRegion {
    fn from(record: RegionRecord) -> Self {
        Self {
            bounds_label: record.bounds_label(),
            record,
        }
    }
}

/// Response of `POST /api/regions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRegionResponse {
    /// The region as stored after the statistics fetch.
    pub region: ApiRegion,
    /// Why metrics are empty, when the fetch failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response of `DELETE /api/regions`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClearRegionsResponse {
    /// Number of regions removed.
    pub removed: usize,
}

/// Response of `POST /api/insights`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResponse {
    /// Insights for stored regions, in the order the model emitted them.
    pub insights: Vec<InsightRecord>,
    /// Ids in the reply that matched no stored region.
    pub dropped: Vec<RegionId>,
    /// Map primitives for every restoration zone.
    pub overlays: Vec<OverlayPrimitive>,
}

/// Response of `GET /api/summary`.
pub type SummaryResponse = DashboardSummary;

/// One element of the `regions` array accepted by
/// `POST /generate-insights`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyRegion {
    /// Caller's id; strings and numbers are accepted.
    pub id: serde_json::Value,
    /// Metrics as returned by the statistics service.
    #[serde(default)]
    pub analysis: RegionMetrics,
    /// Region center.
    pub center: LatLng,
}

impl ProxyRegion {
    /// The id rendered the way it is described to the model.
    #[must_use]
    pub fn region_id(&self) -> RegionId {
        match &self.id {
            serde_json::Value::String(s) => RegionId::new(s.as_str()),
            other => RegionId::new(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_region_flattens_record_and_adds_label() {
        let record = RegionRecord {
            id: RegionId::new("1700000000000"),
            geometry: vec![
                LatLng::new(-3.0, -61.0),
                LatLng::new(-2.0, -61.0),
                LatLng::new(-2.0, -60.0),
            ],
            center: LatLng::new(-2.5, -60.5),
            metrics: RegionMetrics::default(),
            analyzed: false,
        };

        let json = serde_json::to_value(ApiRegion::from(record)).unwrap();

        assert_eq!(json["id"], "1700000000000");
        assert_eq!(json["boundsLabel"], "-2.0000, -61.0000");
        assert_eq!(json["center"]["lat"], -2.5);
    }

    #[test]
    fn proxy_region_accepts_numeric_id_and_missing_analysis() {
        let region: ProxyRegion =
            serde_json::from_value(serde_json::json!({ "id": 42, "center": { "lat": 1.0, "lng": 2.0 } }))
                .unwrap();

        assert_eq!(region.region_id().as_str(), "42");
        assert!(region.analysis.is_empty());
    }

    #[test]
    fn api_error_omits_missing_raw() {
        let json = serde_json::to_value(ApiError::new("boom")).unwrap();

        assert_eq!(json, serde_json::json!({ "error": "boom" }));
    }
}
