//! Builds the single insight prompt for a batch of regions and sends it.
//!
//! The batcher returns the model's raw reply text; parsing lives in
//! [`crate::extract`].

use std::sync::Arc;
use std::time::Duration;

use forest_watch_region_models::{LatLng, RegionId, RegionMetrics, RegionRecord};

use crate::AiError;
use crate::providers::LlmProvider;

/// Default bound on one generative call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// The part of a region that is described to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    /// Region id the model must echo back.
    pub id: RegionId,
    /// Bounding-box center.
    pub center: LatLng,
    /// Metrics; missing fields are described as `0`.
    pub metrics: RegionMetrics,
}

impl From<&RegionRecord> for RegionSummary {
    fn from(record: &RegionRecord) -> Self {
        Self {
            id: record.id.clone(),
            center: record.center,
            metrics: record.metrics.clone(),
        }
    }
}

/// Renders the prompt for `regions`.
///
/// Each region is described by its 1-based position, id, center and the
/// four metric fields, with regions separated by a blank line.
#[must_use]
pub fn build_prompt(regions: &[RegionSummary]) -> String {
    let descriptions = regions
        .iter()
        .enumerate()
        .map(|(index, region)| describe_region(index, region))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"
You are an environmental analyst. Here are multiple region reports:

{descriptions}

For each region:
1. Summarize its environmental condition.
2. Classify restoration priority: High | Medium | Low
3. Suggest up to 2 restoration zones as:
[
  {{ "lat": <latitude>, "lng": <longitude>, "radius_km": <number> }}
]

Respond with a JSON array of this format:
[
  {{
    "id": "region_id",
    "insight": "...",
    "priority": "High|Medium|Low",
    "restoration_zones": [
      {{ "lat": 12.34, "lng": 56.78, "radius_km": 5 }}
    ]
  }},
  ...
]
"#
    )
}

fn describe_region(index: usize, region: &RegionSummary) -> String {
    let metrics = &region.metrics;
    format!(
        "Region {} (ID: {}) at ({}, {}):\n\
         - Biomass: {} MgC/ha\n\
         - Forest Loss Pixels: {}\n\
         - Soil Carbon: {} tons/ha\n\
         - Rainfall: {} mm",
        index + 1,
        region.id,
        region.center.lat,
        region.center.lng,
        metrics.biomass_or_zero(),
        metrics.forest_loss_pixels_or_zero(),
        metrics.soil_carbon_or_zero(),
        metrics.rainfall_or_zero(),
    )
}

/// Sends one prompt per batch to an [`LlmProvider`].
#[derive(Clone)]
pub struct InsightBatcher {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl InsightBatcher {
    /// Creates a batcher with [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the bound on one generative call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Name of the underlying provider.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests one completion describing every region.
    ///
    /// Returns `Ok(None)` without contacting the provider when `regions`
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the provider fails or does not answer within
    /// the timeout. No retry is attempted.
    pub async fn request_raw(&self, regions: &[RegionSummary]) -> Result<Option<String>, AiError> {
        if regions.is_empty() {
            log::debug!("No regions to describe; skipping insight request");
            return Ok(None);
        }

        let prompt = build_prompt(regions);
        log::info!(
            "Requesting insights for {} region(s) from {}",
            regions.len(),
            self.provider.name()
        );

        let reply = tokio::time::timeout(self.timeout, self.provider.complete(&prompt))
            .await
            .map_err(|_| AiError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;

        log::debug!("Insight reply: {} chars", reply.len());
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;

    fn summary(id: &str, lat: f64, lng: f64, metrics: RegionMetrics) -> RegionSummary {
        RegionSummary {
            id: RegionId::new(id),
            center: LatLng::new(lat, lng),
            metrics,
        }
    }

    #[test]
    fn prompt_describes_each_region_with_zero_defaults() {
        let regions = vec![
            summary(
                "r1",
                -3.5,
                -60.25,
                RegionMetrics {
                    biomass_mean_mgc_ha: Some(120.5),
                    forest_loss_pixels: Some(42.0),
                    soil_carbon_mean: Some(55.0),
                    rainfall_mean_mm: Some(2100.0),
                },
            ),
            summary("r2", 1.0, 2.0, RegionMetrics::default()),
        ];

        let prompt = build_prompt(&regions);

        assert!(prompt.contains(
            "Region 1 (ID: r1) at (-3.5, -60.25):\n\
             - Biomass: 120.5 MgC/ha\n\
             - Forest Loss Pixels: 42\n\
             - Soil Carbon: 55 tons/ha\n\
             - Rainfall: 2100 mm\n\n\
             Region 2 (ID: r2) at (1, 2):\n\
             - Biomass: 0 MgC/ha\n\
             - Forest Loss Pixels: 0\n\
             - Soil Carbon: 0 tons/ha\n\
             - Rainfall: 0 mm"
        ));
        assert!(prompt.starts_with("\nYou are an environmental analyst."));
        assert!(prompt.contains("\"restoration_zones\": ["));
    }

    #[tokio::test]
    async fn empty_batch_makes_no_call() {
        let provider = Arc::new(MockProvider::replying("[]"));
        let batcher = InsightBatcher::new(provider.clone());

        let reply = batcher.request_raw(&[]).await.unwrap();

        assert!(reply.is_none());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn returns_raw_reply_text() {
        let provider = Arc::new(MockProvider::replying("Sure! [{\"id\":\"r1\"}]"));
        let batcher = InsightBatcher::new(provider.clone());
        let regions = vec![summary("r1", 0.0, 0.0, RegionMetrics::default())];

        let reply = batcher.request_raw(&regions).await.unwrap();

        assert_eq!(reply.as_deref(), Some("Sure! [{\"id\":\"r1\"}]"));
        assert_eq!(provider.call_count(), 1);
        assert!(provider.last_prompt().unwrap().contains("(ID: r1)"));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let provider =
            Arc::new(MockProvider::replying("[]").with_delay(Duration::from_millis(200)));
        let batcher = InsightBatcher::new(provider).with_timeout(Duration::from_millis(10));
        let regions = vec![summary("r1", 0.0, 0.0, RegionMetrics::default())];

        let err = batcher.request_raw(&regions).await.unwrap_err();

        assert!(matches!(err, AiError::Timeout { .. }));
    }
}
