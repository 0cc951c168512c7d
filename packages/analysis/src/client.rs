//! HTTP client for the `analyze_region` endpoint.

use std::time::Duration;

use forest_watch_region_models::{LatLng, RegionMetrics, polygon_geometry};

use crate::{AnalysisError, StatisticsConfig};

/// Maximum length of a response body kept in [`AnalysisError::Status`].
const BODY_PREVIEW_LEN: usize = 500;

/// Outcome of analyzing one region.
///
/// Fetch failures are recoverable: the region keeps empty metrics and
/// the error travels alongside for display.
#[derive(Debug)]
pub enum MetricsOutcome {
    /// Metrics were fetched.
    Fetched(RegionMetrics),
    /// The fetch failed; the region keeps empty metrics.
    Failed(AnalysisError),
}

impl MetricsOutcome {
    /// Metrics to store on the region (empty on failure).
    #[must_use]
    pub fn metrics(&self) -> RegionMetrics {
        match self {
            Self::Fetched(metrics) => metrics.clone(),
            Self::Failed(_) => RegionMetrics::default(),
        }
    }

    /// The fetch error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&AnalysisError> {
        match self {
            Self::Fetched(_) => None,
            Self::Failed(e) => Some(e),
        }
    }

    /// Returns `true` if the fetch failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Client for the statistics service.
#[derive(Debug, Clone)]
pub struct StatisticsClient {
    client: reqwest::Client,
    config: StatisticsConfig,
}

impl StatisticsClient {
    /// Creates a client whose requests time out after
    /// `config.timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the HTTP client cannot be built.
    pub fn new(config: StatisticsConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a client that reuses an existing [`reqwest::Client`].
    #[must_use]
    pub const fn with_client(client: reqwest::Client, config: StatisticsConfig) -> Self {
        Self { client, config }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Sends a polygon to the statistics service and returns its metrics.
    ///
    /// The request body is `{"geometry": {"type": "Polygon",
    /// "coordinates": [[[lng, lat], ...]]}}`.
    ///
    /// # Errors
    ///
    /// * [`AnalysisError::Http`] on transport failure
    /// * [`AnalysisError::Status`] on a non-success status
    /// * [`AnalysisError::Parse`] if the body is not a JSON object
    pub async fn fetch_metrics(&self, geometry: &[LatLng]) -> Result<RegionMetrics, AnalysisError> {
        let body = serde_json::json!({ "geometry": polygon_geometry(geometry) });

        let resp = self
            .client
            .post(&self.config.base_url)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: preview,
            });
        }

        let value: serde_json::Value = resp.json().await?;
        parse_response(&value)
    }

    /// Like [`Self::fetch_metrics`], but never fails: errors are logged
    /// and returned as [`MetricsOutcome::Failed`].
    pub async fn analyze(&self, geometry: &[LatLng]) -> MetricsOutcome {
        match self.fetch_metrics(geometry).await {
            Ok(metrics) => MetricsOutcome::Fetched(metrics),
            Err(e) => {
                log::debug!("Failed to fetch region analysis: {e}");
                MetricsOutcome::Failed(e)
            }
        }
    }
}

/// Parses the statistics response body.
fn parse_response(body: &serde_json::Value) -> Result<RegionMetrics, AnalysisError> {
    RegionMetrics::from_json_object(body).ok_or_else(|| AnalysisError::Parse {
        message: "Statistics response is not a JSON object".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn triangle() -> Vec<LatLng> {
        vec![
            LatLng::new(-3.0, -62.0),
            LatLng::new(-3.0, -60.0),
            LatLng::new(-5.0, -61.0),
        ]
    }

    fn client_for(server: &MockServer) -> StatisticsClient {
        StatisticsClient::new(StatisticsConfig {
            base_url: format!("{}/analyze_region", server.uri()),
            timeout_secs: 5,
            concurrent_requests: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_polygon_and_parses_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze_region"))
            .and(body_json(serde_json::json!({
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-62.0, -3.0], [-60.0, -3.0], [-61.0, -5.0]]]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "biomass_mean_MgC_ha": 142.3,
                "forest_loss_pixels": 1000,
                "soil_carbon_mean": 51.2,
                "rainfall_mean_mm": 2100.0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let metrics = client_for(&server).fetch_metrics(&triangle()).await.unwrap();
        assert_eq!(metrics.biomass_mean_mgc_ha, Some(142.3));
        assert_eq!(metrics.forest_loss_pixels, Some(1000.0));
        assert_eq!(metrics.soil_carbon_mean, Some(51.2));
        assert_eq!(metrics.rainfall_mean_mm, Some(2100.0));
    }

    #[tokio::test]
    async fn non_success_status_is_a_recoverable_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let outcome = client_for(&server).analyze(&triangle()).await;
        assert!(outcome.is_failed());
        assert!(outcome.metrics().is_empty());
        assert!(matches!(
            outcome.error(),
            Some(AnalysisError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn non_object_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1, 2])))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_metrics(&triangle()).await;
        assert!(matches!(result, Err(AnalysisError::Parse { .. })));
    }

    #[tokio::test]
    async fn unreachable_service_yields_empty_metrics() {
        let client = StatisticsClient::new(StatisticsConfig {
            base_url: "http://127.0.0.1:9/analyze_region".to_string(),
            timeout_secs: 2,
            concurrent_requests: 1,
        })
        .unwrap();

        let outcome = client.analyze(&triangle()).await;
        assert!(matches!(outcome, MetricsOutcome::Failed(AnalysisError::Http(_))));
        assert!(outcome.metrics().is_empty());
    }
}
