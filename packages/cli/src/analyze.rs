//! `analyze`: run the whole pipeline over the polygons of a `GeoJSON`
//! file and report the result as JSON.

use std::path::Path;
use std::sync::Arc;

use forest_watch_ai::batcher::InsightBatcher;
use forest_watch_ai::pipeline::request_insights;
use forest_watch_ai::providers::{LlmProvider, create_provider_from_env};
use forest_watch_analysis::StatisticsClient;
use forest_watch_analysis::selection::select_regions;
use forest_watch_insight_models::InsightRecord;
use forest_watch_overlay::{Calibration, DashboardSummary, OverlayPrimitive, project, summarize};
use forest_watch_region::RegionStore;
use forest_watch_region_models::{LatLng, RegionId, RegionRecord, polygons_from_geojson};
use forest_watch_server::config::{AppConfig, ai_timeout_from_env};
use serde::Serialize;
use thiserror::Error;

/// Errors that stop an analysis run.
#[derive(Debug, Error)]
pub enum CliError {
    /// The input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The input is not valid `GeoJSON`.
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The input holds no polygons.
    #[error("No polygons found in {0}")]
    NoPolygons(String),

    /// Configuration or provider setup failed.
    #[error(transparent)]
    Server(#[from] forest_watch_server::ServerError),

    /// The statistics client could not be built.
    #[error(transparent)]
    Analysis(#[from] forest_watch_analysis::AnalysisError),

    /// The LLM provider could not be created.
    #[error(transparent)]
    Ai(#[from] forest_watch_ai::AiError),
}

/// A polygon that produced a warning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonWarning {
    /// Position of the polygon in the input, from 0.
    pub index: usize,
    /// Region id when the polygon was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<RegionId>,
    /// What went wrong.
    pub message: String,
}

/// Everything produced by one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Stored regions with their metrics.
    pub regions: Vec<RegionRecord>,
    /// Rejected polygons and failed statistics fetches.
    pub warnings: Vec<PolygonWarning>,
    /// Insights kept after matching ids.
    pub insights: Vec<InsightRecord>,
    /// Ids in the reply that matched no region.
    pub dropped: Vec<RegionId>,
    /// Overlay primitives for every restoration zone.
    pub overlays: Vec<OverlayPrimitive>,
    /// Dashboard totals.
    pub summary: DashboardSummary,
    /// Why no insights were produced, if the batch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight_error: Option<String>,
    /// Raw model output attached to `insight_error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Reads polygons from the `GeoJSON` file at `path`.
///
/// # Errors
///
/// Returns [`CliError`] if the file is unreadable, not `GeoJSON`, or has
/// no polygons.
pub fn read_polygons(path: &Path) -> Result<Vec<Vec<LatLng>>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let doc: geojson::GeoJson = text.parse()?;
    let polygons = polygons_from_geojson(&doc);
    if polygons.is_empty() {
        return Err(CliError::NoPolygons(path.display().to_string()));
    }
    log::info!("Read {} polygon(s) from {}", polygons.len(), path.display());
    Ok(polygons)
}

/// Runs the pipeline over `polygons` with a fresh store.
///
/// Insight failures are reported in the result rather than returned as
/// errors. Pass `None` for `batcher` to skip the insight request.
pub async fn analyze_polygons(
    polygons: Vec<Vec<LatLng>>,
    statistics: &StatisticsClient,
    batcher: Option<&InsightBatcher>,
    calibration: &Calibration,
) -> AnalysisReport {
    let store = RegionStore::new();
    let mut warnings = Vec::new();

    for (index, result) in select_regions(&store, statistics, polygons)
        .await
        .into_iter()
        .enumerate()
    {
        match result {
            Ok(selected) => {
                if let Some(e) = selected.outcome.error() {
                    warnings.push(PolygonWarning {
                        index,
                        region_id: Some(selected.id),
                        message: e.to_string(),
                    });
                }
            }
            Err(e) => {
                log::warn!("Skipping polygon {index}: {e}");
                warnings.push(PolygonWarning {
                    index,
                    region_id: None,
                    message: e.to_string(),
                });
            }
        }
    }

    let mut report = AnalysisReport {
        regions: Vec::new(),
        warnings,
        insights: Vec::new(),
        dropped: Vec::new(),
        overlays: Vec::new(),
        summary: summarize(&store.list(), calibration),
        insight_error: None,
        raw: None,
    };

    if let Some(batcher) = batcher {
        match request_insights(batcher, &store).await {
            Ok(batch) => {
                report.overlays = project(&batch.insights, &store.list(), calibration);
                report.insights = batch.insights;
                report.dropped = batch.dropped;
            }
            Err(e) => {
                log::error!("Insight request failed: {e}");
                report.raw = e.raw().map(ToString::to_string);
                report.insight_error = Some(e.to_string());
            }
        }
    }

    report.regions = store.list();
    report
}

/// Loads configuration from the environment and analyzes the file at
/// `path`.
///
/// # Errors
///
/// Returns [`CliError`] if the input, configuration or provider is
/// unusable.
pub async fn run(path: &Path, skip_insights: bool) -> Result<AnalysisReport, CliError> {
    let polygons = read_polygons(path)?;
    let config = AppConfig::from_env()?;
    let statistics = StatisticsClient::new(config.statistics)?;

    let batcher = if skip_insights {
        None
    } else {
        let provider: Arc<dyn LlmProvider> = Arc::from(create_provider_from_env().await?);
        Some(InsightBatcher::new(provider).with_timeout(ai_timeout_from_env()))
    };

    Ok(analyze_polygons(polygons, &statistics, batcher.as_ref(), &config.calibration).await)
}
