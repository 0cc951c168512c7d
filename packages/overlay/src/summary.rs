//! Dashboard totals over the stored regions.

use forest_watch_region_models::{RegionId, RegionRecord};
use serde::Serialize;

use crate::Calibration;

/// Display values for one region. Missing metrics are reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionFigures {
    /// Region id.
    pub id: RegionId,
    /// Mean biomass in MgC/ha.
    pub biomass_mgc_ha: f64,
    /// Forest loss in hectares.
    pub forest_loss_hectares: f64,
    /// Mean soil carbon.
    pub soil_carbon: f64,
    /// Mean rainfall in mm.
    pub rainfall_mm: f64,
    /// Whether metrics were attached.
    pub analyzed: bool,
}

/// Totals shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Number of stored regions.
    pub region_count: usize,
    /// Sum of forest loss over all regions, in hectares.
    pub forest_loss_hectares: f64,
    /// Sum of CO2-equivalent over all regions, in tons.
    pub carbon_emissions_tons: f64,
    /// Per-region figures in store order.
    pub regions: Vec<RegionFigures>,
}

/// Computes dashboard totals for `regions`.
#[must_use]
pub fn summarize(regions: &[RegionRecord], calibration: &Calibration) -> DashboardSummary {
    let figures = regions
        .iter()
        .map(|region| {
            let metrics = &region.metrics;
            RegionFigures {
                id: region.id.clone(),
                biomass_mgc_ha: metrics.biomass_or_zero(),
                forest_loss_hectares: calibration
                    .forest_loss_hectares(metrics.forest_loss_pixels_or_zero()),
                soil_carbon: metrics.soil_carbon_or_zero(),
                rainfall_mm: metrics.rainfall_or_zero(),
                analyzed: region.analyzed,
            }
        })
        .collect::<Vec<_>>();

    DashboardSummary {
        region_count: regions.len(),
        forest_loss_hectares: figures.iter().map(|f| f.forest_loss_hectares).sum(),
        carbon_emissions_tons: regions
            .iter()
            .map(|r| calibration.co2_tons(r.metrics.biomass_or_zero()))
            .sum(),
        regions: figures,
    }
}
