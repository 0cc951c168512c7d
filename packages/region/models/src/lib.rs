#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region geometry, environmental metrics and record types.
//!
//! A region is a user-drawn polygon on the map. These types are shared
//! by the region store, the statistics client, the insight batcher and
//! the overlay projector. They are independent of any transport.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl LatLng {
    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` if both components are finite and within the WGS84
    /// latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Identifier of a region, assigned by the store when the region is added.
///
/// Serialized as a plain string (e.g. `"1712345678901"`), which is what the
/// generative model is asked to echo back.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    /// Wraps an existing identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RegionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Environmental metrics returned by the statistics service for a region.
///
/// Every field is optional. Consumers that need a number use the
/// `*_or_zero` accessors, which treat a missing metric as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Mean above-ground biomass (MgC/ha).
    #[serde(
        rename = "biomass_mean_MgC_ha",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub biomass_mean_mgc_ha: Option<f64>,
    /// Number of forest-loss pixels inside the polygon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forest_loss_pixels: Option<f64>,
    /// Mean soil organic carbon (tons/ha).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_carbon_mean: Option<f64>,
    /// Mean rainfall (mm).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall_mean_mm: Option<f64>,
}

impl RegionMetrics {
    /// JSON field name of the biomass metric.
    pub const BIOMASS_FIELD: &str = "biomass_mean_MgC_ha";
    /// JSON field name of the forest-loss pixel count.
    pub const FOREST_LOSS_FIELD: &str = "forest_loss_pixels";
    /// JSON field name of the soil carbon metric.
    pub const SOIL_CARBON_FIELD: &str = "soil_carbon_mean";
    /// JSON field name of the rainfall metric.
    pub const RAINFALL_FIELD: &str = "rainfall_mean_mm";

    /// Returns `true` if no metric is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.biomass_mean_mgc_ha.is_none()
            && self.forest_loss_pixels.is_none()
            && self.soil_carbon_mean.is_none()
            && self.rainfall_mean_mm.is_none()
    }

    /// Picks the recognized numeric fields out of an arbitrary JSON object.
    ///
    /// Unknown fields and non-numeric values are ignored. Returns `None`
    /// if `value` is not an object.
    #[must_use]
    pub fn from_json_object(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let number = |key: &str| obj.get(key).and_then(serde_json::Value::as_f64);

        Some(Self {
            biomass_mean_mgc_ha: number(Self::BIOMASS_FIELD),
            forest_loss_pixels: number(Self::FOREST_LOSS_FIELD),
            soil_carbon_mean: number(Self::SOIL_CARBON_FIELD),
            rainfall_mean_mm: number(Self::RAINFALL_FIELD),
        })
    }

    /// Biomass, or zero when missing.
    #[must_use]
    pub fn biomass_or_zero(&self) -> f64 {
        self.biomass_mean_mgc_ha.unwrap_or(0.0)
    }

    /// Forest-loss pixel count, or zero when missing.
    #[must_use]
    pub fn forest_loss_pixels_or_zero(&self) -> f64 {
        self.forest_loss_pixels.unwrap_or(0.0)
    }

    /// Soil carbon, or zero when missing.
    #[must_use]
    pub fn soil_carbon_or_zero(&self) -> f64 {
        self.soil_carbon_mean.unwrap_or(0.0)
    }

    /// Rainfall, or zero when missing.
    #[must_use]
    pub fn rainfall_or_zero(&self) -> f64 {
        self.rainfall_mean_mm.unwrap_or(0.0)
    }
}

/// A user-selected region and its computed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRecord {
    /// Unique identifier assigned at creation.
    pub id: RegionId,
    /// Polygon vertices in drawing order.
    pub geometry: Vec<LatLng>,
    /// Center of the geometry's bounding box.
    pub center: LatLng,
    /// Environmental metrics. Empty until the statistics fetch completes,
    /// and left empty if it fails.
    pub metrics: RegionMetrics,
    /// Whether a metrics attachment has happened. Metrics are attached at
    /// most once.
    pub analyzed: bool,
}

impl RegionRecord {
    /// Returns the polygon as a `GeoJSON` geometry with `[lng, lat]`
    /// positions, vertices in drawing order.
    #[must_use]
    pub fn to_geojson_polygon(&self) -> geojson::Geometry {
        polygon_geometry(&self.geometry)
    }

    /// Short label describing the selection: north-east latitude and
    /// south-west longitude of the bounding box, four decimals each.
    #[must_use]
    pub fn bounds_label(&self) -> String {
        let north = self
            .geometry
            .iter()
            .map(|p| p.lat)
            .fold(f64::NEG_INFINITY, f64::max);
        let west = self
            .geometry
            .iter()
            .map(|p| p.lng)
            .fold(f64::INFINITY, f64::min);
        format!("{north:.4}, {west:.4}")
    }
}

/// Builds a `GeoJSON` `Polygon` geometry from `(lat, lng)` vertices.
///
/// The single exterior ring lists the vertices as given; the ring is not
/// closed by repeating the first vertex.
#[must_use]
pub fn polygon_geometry(vertices: &[LatLng]) -> geojson::Geometry {
    let ring: Vec<Vec<f64>> = vertices.iter().map(|p| vec![p.lng, p.lat]).collect();
    geojson::Geometry::new(geojson::Value::Polygon(vec![ring]))
}

/// Extracts every polygon exterior ring from a `GeoJSON` document.
///
/// Accepts a bare geometry, a feature or a feature collection. `Polygon`
/// geometries contribute their exterior ring; `MultiPolygon` geometries
/// contribute one ring per part. Other geometry types are skipped. A
/// closing vertex equal to the first vertex is dropped.
#[must_use]
pub fn polygons_from_geojson(doc: &geojson::GeoJson) -> Vec<Vec<LatLng>> {
    let mut polygons = Vec::new();

    match doc {
        geojson::GeoJson::Geometry(geometry) => collect_rings(geometry, &mut polygons),
        geojson::GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                collect_rings(geometry, &mut polygons);
            }
        }
        geojson::GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                if let Some(geometry) = &feature.geometry {
                    collect_rings(geometry, &mut polygons);
                }
            }
        }
    }

    polygons
}

fn collect_rings(geometry: &geojson::Geometry, out: &mut Vec<Vec<LatLng>>) {
    match &geometry.value {
        geojson::Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                out.push(ring_to_vertices(exterior));
            }
        }
        geojson::Value::MultiPolygon(parts) => {
            for rings in parts {
                if let Some(exterior) = rings.first() {
                    out.push(ring_to_vertices(exterior));
                }
            }
        }
        geojson::Value::GeometryCollection(geometries) => {
            for inner in geometries {
                collect_rings(inner, out);
            }
        }
        _ => {}
    }
}

fn ring_to_vertices(ring: &[Vec<f64>]) -> Vec<LatLng> {
    let mut vertices: Vec<LatLng> = ring
        .iter()
        .filter(|position| position.len() >= 2)
        .map(|position| LatLng::new(position[1], position[0]))
        .collect();

    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    vertices
}
