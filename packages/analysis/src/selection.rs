//! Region selection: store a drawn polygon, then fetch and attach its
//! metrics.

use forest_watch_region::{AttachOutcome, RegionError, RegionStore};
use forest_watch_region_models::{LatLng, RegionId};
use futures::stream::{self, StreamExt as _};

use crate::{MetricsOutcome, StatisticsClient};

/// A region that was added to the store, with the result of its
/// statistics fetch.
#[derive(Debug)]
pub struct SelectedRegion {
    /// Id assigned by the store.
    pub id: RegionId,
    /// Result of the statistics fetch.
    pub outcome: MetricsOutcome,
    /// Whether the metrics landed on the record; `None` when the fetch
    /// failed and nothing was attached. [`AttachOutcome::Missing`] means
    /// the region was removed while the fetch was in flight.
    pub attach: Option<AttachOutcome>,
}

/// Adds a polygon to the store, fetches its metrics and attaches them.
///
/// A fetch failure leaves the region stored with empty metrics.
///
/// # Errors
///
/// Returns [`RegionError`] if the polygon is invalid; nothing is stored
/// and no request is sent in that case.
pub async fn select_region(
    store: &RegionStore,
    client: &StatisticsClient,
    geometry: Vec<LatLng>,
) -> Result<SelectedRegion, RegionError> {
    let record = store.add_record(geometry)?;
    Ok(analyze_and_attach(store, client, record.id, &record.geometry).await)
}

/// Adds several polygons and fetches their metrics concurrently (at most
/// `concurrent_requests` in flight).
///
/// Regions are added in input order before any request is sent, so ids
/// follow input order. Results are returned in input order.
pub async fn select_regions(
    store: &RegionStore,
    client: &StatisticsClient,
    polygons: Vec<Vec<LatLng>>,
) -> Vec<Result<SelectedRegion, RegionError>> {
    let added: Vec<Result<(RegionId, Vec<LatLng>), RegionError>> = polygons
        .into_iter()
        .map(|geometry| store.add_record(geometry).map(|r| (r.id, r.geometry)))
        .collect();

    let concurrency = client.config().concurrent_requests.max(1);
    log::info!(
        "Fetching statistics for {} region(s) (concurrency={concurrency})",
        added.iter().filter(|r| r.is_ok()).count()
    );

    let mut results: Vec<(usize, Result<SelectedRegion, RegionError>)> =
        stream::iter(added.into_iter().enumerate().map(|(idx, entry)| async move {
            let result = match entry {
                Ok((id, vertices)) => Ok(analyze_and_attach(store, client, id, &vertices).await),
                Err(e) => Err(e),
            };
            (idx, result)
        }))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, result)| result).collect()
}

async fn analyze_and_attach(
    store: &RegionStore,
    client: &StatisticsClient,
    id: RegionId,
    vertices: &[LatLng],
) -> SelectedRegion {
    let outcome = client.analyze(vertices).await;
    let attach = match &outcome {
        MetricsOutcome::Fetched(metrics) => Some(store.attach_metrics(&id, metrics.clone())),
        MetricsOutcome::Failed(e) => {
            log::warn!("Region {id} stored with empty metrics: {e}");
            None
        }
    };
    SelectedRegion {
        id,
        outcome,
        attach,
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::StatisticsConfig;

    fn triangle(offset: f64) -> Vec<LatLng> {
        vec![
            LatLng::new(-3.0 + offset, -62.0),
            LatLng::new(-3.0 + offset, -60.0),
            LatLng::new(-5.0 + offset, -61.0),
        ]
    }

    async fn client_returning(status: u16, body: serde_json::Value) -> (MockServer, StatisticsClient) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        let client = StatisticsClient::new(StatisticsConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            concurrent_requests: 3,
        })
        .unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn select_region_attaches_metrics() {
        let (_server, client) =
            client_returning(200, serde_json::json!({ "forest_loss_pixels": 250 })).await;
        let store = RegionStore::new();

        let selected = select_region(&store, &client, triangle(0.0)).await.unwrap();
        assert_eq!(selected.attach, Some(AttachOutcome::Attached));

        let record = store.get(&selected.id).unwrap();
        assert!(record.analyzed);
        assert_eq!(record.metrics.forest_loss_pixels, Some(250.0));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_region_with_empty_metrics() {
        let (_server, client) = client_returning(500, serde_json::json!({})).await;
        let store = RegionStore::new();

        let selected = select_region(&store, &client, triangle(0.0)).await.unwrap();
        assert!(selected.outcome.is_failed());
        assert_eq!(selected.attach, None);
        assert_eq!(store.len(), 1);
        let record = store.get(&selected.id).unwrap();
        assert!(record.metrics.is_empty());
        assert!(!record.analyzed);
    }

    #[tokio::test]
    async fn invalid_polygon_sends_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;
        let client = StatisticsClient::new(StatisticsConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            concurrent_requests: 1,
        })
        .unwrap();
        let store = RegionStore::new();

        let result = select_region(&store, &client, vec![LatLng::new(0.0, 0.0)]).await;
        assert!(matches!(result, Err(RegionError::TooFewVertices { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn select_regions_keeps_input_order_and_skips_invalid() {
        let (_server, client) =
            client_returning(200, serde_json::json!({ "biomass_mean_MgC_ha": 80.0 })).await;
        let store = RegionStore::new();

        let results = select_regions(
            &store,
            &client,
            vec![triangle(0.0), vec![LatLng::new(0.0, 0.0)], triangle(1.0)],
        )
        .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(&listed[0].id, &results[0].as_ref().unwrap().id);
        assert_eq!(&listed[1].id, &results[2].as_ref().unwrap().id);
        assert!(listed.iter().all(|r| r.metrics.biomass_mean_mgc_ha == Some(80.0)));
    }

    #[tokio::test]
    async fn posts_the_normalized_ring_for_each_region() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-62.0, -3.0], [-60.0, -3.0], [-61.0, -5.0]]]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;
        let client = StatisticsClient::new(StatisticsConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            concurrent_requests: 2,
        })
        .unwrap();
        let store = RegionStore::new();
        let mut closed = triangle(0.0);
        closed.push(closed[0]);

        let results = select_regions(&store, &client, vec![closed.clone(), closed]).await;

        assert!(results.iter().all(|r| {
            r.as_ref().is_ok_and(|s| !s.outcome.is_failed())
        }));
    }
}
