//! Restoration zones to renderable primitives.

use std::collections::BTreeSet;

use forest_watch_insight_models::{InsightRecord, Priority, RestorationZone};
use forest_watch_region_models::{LatLng, RegionId, RegionRecord};
use serde::Serialize;

use crate::Calibration;

/// Fill and stroke styling of a primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    /// CSS color, or `"transparent"`.
    pub fill_color: &'static str,
    /// Fill opacity in `0.0..=1.0`.
    pub fill_opacity: f64,
    /// CSS stroke color.
    pub stroke_color: &'static str,
    /// Stroke width in pixels.
    pub stroke_weight: f64,
    /// Stroke opacity; renderer default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,
}

impl Style {
    /// Circular marker symbol at the zone center.
    #[must_use]
    pub const fn marker() -> Self {
        Self {
            fill_color: "#10B981",
            fill_opacity: 0.4,
            stroke_color: "#059669",
            stroke_weight: 2.0,
            stroke_opacity: None,
        }
    }

    /// Filled inner "glow" circle.
    #[must_use]
    pub const fn inner_circle() -> Self {
        Self {
            fill_color: "#34D399",
            fill_opacity: 0.6,
            stroke_color: "#10B981",
            stroke_weight: 0.0,
            stroke_opacity: None,
        }
    }

    /// Unfilled outer boundary circle.
    #[must_use]
    pub const fn outer_circle() -> Self {
        Self {
            fill_color: "transparent",
            fill_opacity: 0.0,
            stroke_color: "#059669",
            stroke_weight: 2.0,
            stroke_opacity: Some(0.8),
        }
    }
}

/// Which of the two nested circles a primitive is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircleRole {
    /// Half the zone radius.
    Inner,
    /// The full zone radius.
    Outer,
}

/// A map primitive handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayPrimitive {
    /// Circle symbol with a screen-space scale.
    #[serde(rename_all = "camelCase")]
    Marker {
        /// Region the zone belongs to.
        region_id: RegionId,
        /// Priority of that region's insight.
        priority: Priority,
        /// Zone center.
        position: LatLng,
        /// Symbol scale.
        scale: f64,
        /// Styling.
        style: Style,
    },
    /// Geographic circle with a radius in meters.
    #[serde(rename_all = "camelCase")]
    Circle {
        /// Region the zone belongs to.
        region_id: RegionId,
        /// Inner or outer ring.
        role: CircleRole,
        /// Zone center.
        center: LatLng,
        /// Radius in meters.
        radius_m: f64,
        /// Styling.
        style: Style,
    },
}

impl OverlayPrimitive {
    /// Region the primitive was derived from.
    #[must_use]
    pub const fn region_id(&self) -> &RegionId {
        match self {
            Self::Marker { region_id, .. } | Self::Circle { region_id, .. } => region_id,
        }
    }
}

/// Emits a marker, an inner circle and an outer circle for every
/// restoration zone of every insight, in insight order.
///
/// Insights are matched to `regions` by id; an insight whose region is
/// not present is skipped.
#[must_use]
pub fn project(
    insights: &[InsightRecord],
    regions: &[RegionRecord],
    calibration: &Calibration,
) -> Vec<OverlayPrimitive> {
    let known = regions.iter().map(|r| &r.id).collect::<BTreeSet<_>>();

    insights
        .iter()
        .filter(|insight| {
            let present = known.contains(&insight.region_id);
            if !present {
                log::warn!(
                    "No region {} for insight; skipping its overlays",
                    insight.region_id
                );
            }
            present
        })
        .flat_map(|insight| {
            insight.restoration_zones.iter().flat_map(move |zone| {
                zone_primitives(&insight.region_id, &insight.priority, zone, calibration)
            })
        })
        .collect()
}

fn zone_primitives(
    region_id: &RegionId,
    priority: &Priority,
    zone: &RestorationZone,
    calibration: &Calibration,
) -> [OverlayPrimitive; 3] {
    let center = LatLng::new(zone.lat, zone.lng);
    [
        OverlayPrimitive::Marker {
            region_id: region_id.clone(),
            priority: priority.clone(),
            position: center,
            scale: calibration.marker_scale(zone.radius_km),
            style: Style::marker(),
        },
        OverlayPrimitive::Circle {
            region_id: region_id.clone(),
            role: CircleRole::Inner,
            center,
            radius_m: calibration.inner_radius_m(zone.radius_km),
            style: Style::inner_circle(),
        },
        OverlayPrimitive::Circle {
            region_id: region_id.clone(),
            role: CircleRole::Outer,
            center,
            radius_m: calibration.outer_radius_m(zone.radius_km),
            style: Style::outer_circle(),
        },
    ]
}
