#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Insight types produced from the generative model's reply.
//!
//! An [`InsightRecord`] is derived per request and never persisted. Its
//! serde representation is the wire shape the model is asked to emit:
//!
//! ```json
//! { "id": "...", "insight": "...", "priority": "High",
//!   "restoration_zones": [{ "lat": 12.34, "lng": 56.78, "radius_km": 5 }] }
//! ```

use std::str::FromStr as _;

use forest_watch_region_models::RegionId;
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::EnumString;

/// Maximum number of restoration zones kept per insight.
pub const MAX_RESTORATION_ZONES: usize = 2;

/// Restoration priority of a region.
///
/// Labels the model invents are kept verbatim in [`Priority::Other`]
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum Priority {
    /// Urgent restoration need.
    High,
    /// Moderate restoration need.
    Medium,
    /// Low restoration need.
    Low,
    /// Any other label, kept as emitted.
    #[strum(default)]
    Other(String),
}

impl Priority {
    /// The label as displayed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Other(label) => label,
        }
    }

    /// Returns `true` for `High`, `Medium` and `Low`.
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Sort key: `High` first, unrecognized labels last.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Other(_) => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Priority {
    fn from(label: String) -> Self {
        Self::from_str(&label).unwrap_or(Self::Other(label))
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Other(label) => label,
            recognized => recognized.as_str().to_string(),
        }
    }
}

/// A suggested reforestation point and radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestorationZone {
    /// Latitude of the zone center.
    pub lat: f64,
    /// Longitude of the zone center.
    pub lng: f64,
    /// Radius in kilometres.
    pub radius_km: f64,
}

/// A generated assessment of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    /// Id of the region this insight describes.
    #[serde(rename = "id", deserialize_with = "region_id_from_string_or_number")]
    pub region_id: RegionId,
    /// Free-text environmental assessment.
    #[serde(rename = "insight", default)]
    pub summary: String,
    /// Restoration priority.
    pub priority: Priority,
    /// Suggested restoration zones, in emitted order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub restoration_zones: Vec<RestorationZone>,
}

/// Accepts `"123"` as well as `123`; models sometimes drop the quotes
/// around numeric ids.
fn region_id_from_string_or_number<'de, D>(deserializer: D) -> Result<RegionId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => RegionId::new(text),
        RawId::Integer(n) => RegionId::new(n.to_string()),
        RawId::Float(n) => RegionId::new(n.to_string()),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<RestorationZone>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<RestorationZone>>::deserialize(deserializer)?.unwrap_or_default())
}
