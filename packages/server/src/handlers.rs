//! HTTP handler functions for the forest watch API.

use actix_web::{HttpResponse, web};
use forest_watch_ai::InsightError;
use forest_watch_ai::batcher::RegionSummary;
use forest_watch_ai::pipeline::{generate_insights_json, request_insights};
use forest_watch_analysis::selection::select_region;
use forest_watch_overlay::{project, summarize};
use forest_watch_region_models::RegionId;
use forest_watch_server_models::{
    AddRegionRequest, AddRegionResponse, ApiError, ApiHealth, ApiRegion, ClearRegionsResponse,
    InsightsResponse, ProxyRegion,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/regions`
pub async fn list_regions(state: web::Data<AppState>) -> HttpResponse {
    let regions: Vec<ApiRegion> = state.store.list().into_iter().map(ApiRegion::from).collect();
    HttpResponse::Ok().json(regions)
}

/// `POST /api/regions`
///
/// Stores the polygon, fetches its metrics and attaches them. A failed
/// fetch still stores the region and is reported as `warning`.
pub async fn add_region(
    state: web::Data<AppState>,
    body: web::Json<AddRegionRequest>,
) -> HttpResponse {
    let geometry = body.into_inner().geometry;

    let selected = match select_region(&state.store, &state.statistics, geometry).await {
        Ok(selected) => selected,
        Err(e) => {
            log::debug!("Rejected polygon: {e}");
            return HttpResponse::BadRequest().json(ApiError::new(e.to_string()));
        }
    };

    let Some(record) = state.store.get(&selected.id) else {
        return HttpResponse::NotFound().json(ApiError::new(format!(
            "Region {} was removed while it was being analyzed",
            selected.id
        )));
    };

    HttpResponse::Ok().json(AddRegionResponse {
        region: ApiRegion::from(record),
        warning: selected.outcome.error().map(ToString::to_string),
    })
}

/// `DELETE /api/regions`
pub async fn clear_regions(state: web::Data<AppState>) -> HttpResponse {
    let removed = state.store.remove_all();
    HttpResponse::Ok().json(ClearRegionsResponse { removed })
}

/// `DELETE /api/regions/{id}`
pub async fn remove_region(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = RegionId::new(path.into_inner());
    if state.store.remove(&id) {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::NotFound().json(ApiError::new(format!("No region with id {id}")))
    }
}

/// `POST /api/insights`
///
/// Requests insights for every stored region and projects their
/// restoration zones. Only one batch may be in flight at a time.
pub async fn insights(state: web::Data<AppState>) -> HttpResponse {
    let Ok(_guard) = state.batch_lock.try_lock() else {
        return HttpResponse::Conflict().json(ApiError::new(
            "An insight request is already in progress",
        ));
    };

    match request_insights(&state.batcher, &state.store).await {
        Ok(batch) => {
            let overlays = project(&batch.insights, &state.store.list(), &state.calibration);
            HttpResponse::Ok().json(InsightsResponse {
                insights: batch.insights,
                dropped: batch.dropped,
                overlays,
            })
        }
        Err(e) => insight_error_response(&e, e.to_string()),
    }
}

/// `GET /api/summary`
pub async fn summary(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(summarize(&state.store.list(), &state.calibration))
}

/// `POST /generate-insights`
///
/// Stateless proxy: describes the caller's regions to the model and
/// returns the extracted JSON array as-is.
pub async fn generate_insights(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    let Some(regions) = body.get("regions").filter(|r| r.is_array()) else {
        return HttpResponse::BadRequest()
            .json(ApiError::new("Expected 'regions' to be an array"));
    };

    let regions: Vec<ProxyRegion> = match serde_json::from_value(regions.clone()) {
        Ok(regions) => regions,
        Err(e) => {
            return HttpResponse::BadRequest().json(ApiError::new(format!("Invalid region: {e}")));
        }
    };

    let summaries: Vec<RegionSummary> = regions
        .iter()
        .map(|region| RegionSummary {
            id: region.region_id(),
            center: region.center,
            metrics: region.analysis.clone(),
        })
        .collect();

    match generate_insights_json(&state.batcher, &summaries).await {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => {
            let message = match &e {
                InsightError::UpstreamUnavailable { .. } => "OpenAI call failed",
                InsightError::ExtractionFailed { .. } => {
                    "Failed to extract JSON from OpenAI response"
                }
                InsightError::MalformedPayload { .. } => "Failed to parse extracted JSON",
            };
            insight_error_response(&e, message.to_string())
        }
    }
}

/// Maps a batch failure to a JSON error with the matching status.
fn insight_error_response(e: &InsightError, message: String) -> HttpResponse {
    let body = match e.raw() {
        Some(raw) => ApiError::with_raw(message, raw),
        None => ApiError::new(message),
    };

    match e {
        InsightError::UpstreamUnavailable { .. } => {
            log::error!("Insight request failed: {e}");
            HttpResponse::BadGateway().json(body)
        }
        InsightError::ExtractionFailed { .. } | InsightError::MalformedPayload { .. } => {
            HttpResponse::UnprocessableEntity().json(body)
        }
    }
}
