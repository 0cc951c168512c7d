//! "Request insights for current regions": snapshot the store, ask the
//! model once, extract, and keep only insights for regions that were part
//! of the request.

use std::collections::BTreeSet;

use forest_watch_insight_models::InsightRecord;
use forest_watch_region::RegionStore;
use forest_watch_region_models::RegionId;

use crate::InsightError;
use crate::batcher::{InsightBatcher, RegionSummary};
use crate::extract::{extract_insights, extract_json};

/// Insights produced for one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightBatch {
    /// Insights whose id matched a requested region, in emitted order.
    pub insights: Vec<InsightRecord>,
    /// Ids the model returned that matched no requested region.
    pub dropped: Vec<RegionId>,
}

/// Requests insights for every region currently in `store`.
///
/// The store is only read. An empty store yields an empty batch without a
/// provider call.
///
/// # Errors
///
/// Returns [`InsightError`] if the provider is unavailable or its reply
/// cannot be turned into insights. No partial result is returned.
pub async fn request_insights(
    batcher: &InsightBatcher,
    store: &RegionStore,
) -> Result<InsightBatch, InsightError> {
    let snapshot = store
        .list()
        .iter()
        .map(RegionSummary::from)
        .collect::<Vec<_>>();

    let Some(reply) = batcher.request_raw(&snapshot).await? else {
        return Ok(InsightBatch::default());
    };

    let insights = extract_insights(&reply).into_result()?;
    let requested = snapshot.iter().map(|r| &r.id).collect::<BTreeSet<_>>();
    let batch = reconcile(insights, &requested);

    log::info!(
        "Insight batch complete: {} kept, {} dropped",
        batch.insights.len(),
        batch.dropped.len()
    );

    Ok(batch)
}

/// Sends caller-supplied region descriptions and returns the extracted
/// array untouched, without checking ids.
///
/// # Errors
///
/// Returns [`InsightError`] as for [`request_insights`].
pub async fn generate_insights_json(
    batcher: &InsightBatcher,
    regions: &[RegionSummary],
) -> Result<serde_json::Value, InsightError> {
    match batcher.request_raw(regions).await? {
        Some(reply) => extract_json(&reply),
        None => Ok(serde_json::Value::Array(Vec::new())),
    }
}

fn reconcile(insights: Vec<InsightRecord>, requested: &BTreeSet<&RegionId>) -> InsightBatch {
    let (kept, unmatched): (Vec<_>, Vec<_>) = insights
        .into_iter()
        .partition(|insight| requested.contains(&insight.region_id));

    let dropped = unmatched
        .into_iter()
        .map(|insight| {
            log::warn!(
                "Dropping insight for unknown region id {}",
                insight.region_id
            );
            insight.region_id
        })
        .collect();

    InsightBatch {
        insights: kept,
        dropped,
    }
}
