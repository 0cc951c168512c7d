//! Recovers a JSON array of insights from free-text model output.
//!
//! The reply is expected to contain an array of objects somewhere, often
//! behind a sentence of prose or inside a markdown fence. The scan takes
//! the first match of a greedy `[ { ... } ]` pattern, so a bracketed
//! object in the preamble widens the match and the reply is reported as
//! malformed.

use std::sync::LazyLock;

use forest_watch_insight_models::{
    InsightRecord, MAX_RESTORATION_ZONES, Priority, RestorationZone,
};
use forest_watch_region_models::RegionId;
use regex::Regex;
use serde::Deserialize as _;
use serde_json::Value;

use crate::InsightError;

/// Longest slice of raw text included in log messages.
const LOG_PREVIEW_CHARS: usize = 200;

/// Array-of-objects shape: `[`, optional whitespace, `{`, anything, `}`,
/// optional whitespace, `]`.
static JSON_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*\{[\s\S]*\}\s*\]").expect("valid regex"));

/// Result of extracting insights from one reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// The array was found and parsed.
    Success(Vec<InsightRecord>),
    /// No array-shaped substring exists; carries the full reply.
    ExtractionFailed(String),
    /// The array-shaped substring is not valid JSON.
    MalformedPayload {
        /// The located substring.
        raw: String,
        /// Parser error message.
        message: String,
    },
}

impl ExtractionOutcome {
    /// Converts into a `Result`, classifying failures as [`InsightError`].
    ///
    /// # Errors
    ///
    /// Returns [`InsightError::ExtractionFailed`] or
    /// [`InsightError::MalformedPayload`] for the matching variants.
    pub fn into_result(self) -> Result<Vec<InsightRecord>, InsightError> {
        match self {
            Self::Success(insights) => Ok(insights),
            Self::ExtractionFailed(raw) => Err(InsightError::ExtractionFailed { raw }),
            Self::MalformedPayload { raw, message } => {
                Err(InsightError::MalformedPayload { raw, message })
            }
        }
    }
}

/// Returns the first array-of-objects shaped substring of `text`.
#[must_use]
pub fn locate_array(text: &str) -> Option<&str> {
    JSON_ARRAY_RE.find(text).map(|m| m.as_str())
}

/// Locates and parses the array as untyped JSON.
///
/// # Errors
///
/// Returns [`InsightError::ExtractionFailed`] if no array is found and
/// [`InsightError::MalformedPayload`] if it does not parse.
pub fn extract_json(text: &str) -> Result<serde_json::Value, InsightError> {
    let Some(raw) = locate_array(text) else {
        log::warn!("No JSON array in model reply: {}", preview(text));
        return Err(InsightError::ExtractionFailed {
            raw: text.to_string(),
        });
    };

    serde_json::from_str(raw).map_err(|e| {
        log::warn!("Extracted array is not valid JSON ({e}): {}", preview(raw));
        InsightError::MalformedPayload {
            raw: raw.to_string(),
            message: e.to_string(),
        }
    })
}

/// Extracts typed insights from a model reply.
///
/// Only text that is not valid JSON fails the batch. Each element of the
/// array is then read on its own:
///
/// * elements without a string or numeric `id` are skipped
/// * a missing `insight` is empty and a non-string one is kept as JSON text
/// * a non-string `priority` is kept as [`Priority::Other`] holding its
///   JSON text, and a missing one as an empty label
/// * zones that are not `{lat, lng, radius_km}` numbers are skipped, and
///   zones beyond [`MAX_RESTORATION_ZONES`] are discarded
#[must_use]
pub fn extract_insights(text: &str) -> ExtractionOutcome {
    let Some(raw) = locate_array(text) else {
        log::warn!("No JSON array in model reply: {}", preview(text));
        return ExtractionOutcome::ExtractionFailed(text.to_string());
    };

    let elements = match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(elements) => elements,
        Err(e) => {
            log::warn!("Extracted array failed to parse ({e}): {}", preview(raw));
            return ExtractionOutcome::MalformedPayload {
                raw: raw.to_string(),
                message: e.to_string(),
            };
        }
    };

    let total = elements.len();
    let insights: Vec<InsightRecord> = elements
        .iter()
        .enumerate()
        .filter_map(|(index, element)| insight_from_element(index, element))
        .collect();

    if insights.len() < total {
        log::warn!(
            "Kept {} of {total} insight element(s) from the model reply",
            insights.len()
        );
    }

    ExtractionOutcome::Success(insights)
}

fn insight_from_element(index: usize, element: &Value) -> Option<InsightRecord> {
    let Some(fields) = element.as_object() else {
        log::warn!("Skipping insight element {index}: not an object");
        return None;
    };

    let region_id = match fields.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => RegionId::new(id.clone()),
        Some(Value::Number(id)) => RegionId::new(id.to_string()),
        other => {
            log::warn!("Skipping insight element {index}: unusable id {other:?}");
            return None;
        }
    };

    let summary = match fields.get("insight") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };

    let priority = match fields.get("priority") {
        Some(Value::String(label)) => Priority::from(label.clone()),
        None | Some(Value::Null) => Priority::Other(String::new()),
        Some(other) => Priority::Other(other.to_string()),
    };
    if !priority.is_recognized() {
        log::debug!("Region {region_id} has unrecognized priority '{priority}'");
    }

    let mut restoration_zones = match fields.get("restoration_zones") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(zones)) => zones
            .iter()
            .filter_map(|zone| {
                RestorationZone::deserialize(zone)
                    .map_err(|e| {
                        log::warn!("Skipping restoration zone for region {region_id}: {e}");
                    })
                    .ok()
            })
            .collect(),
        Some(other) => {
            log::warn!("Ignoring restoration zones for region {region_id}: {other}");
            Vec::new()
        }
    };

    if restoration_zones.len() > MAX_RESTORATION_ZONES {
        log::warn!(
            "Insight for region {region_id} has {} restoration zones; keeping the first {MAX_RESTORATION_ZONES}",
            restoration_zones.len(),
        );
        restoration_zones.truncate(MAX_RESTORATION_ZONES);
    }

    Some(InsightRecord {
        region_id,
        summary,
        priority,
        restoration_zones,
    })
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_fenced_reply() {
        let text = "Here you go:\n```json\n[{\"id\":\"r1\",\"priority\":\"High\",\"restoration_zones\":[]}]\n```";

        let ExtractionOutcome::Success(insights) = extract_insights(text) else {
            panic!("expected success");
        };

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].region_id.as_str(), "r1");
        assert_eq!(insights[0].priority, Priority::High);
        assert!(insights[0].restoration_zones.is_empty());
    }

    #[test]
    fn reply_without_array_fails_extraction_verbatim() {
        let text = "I cannot help with that.";

        assert_eq!(
            extract_insights(text),
            ExtractionOutcome::ExtractionFailed("I cannot help with that.".to_string())
        );
    }

    #[test]
    fn invalid_json_inside_brackets_is_malformed() {
        let text = "[{\"id\":\"r1\", priority: High}]";

        let outcome = extract_insights(text);

        let ExtractionOutcome::MalformedPayload { raw, .. } = outcome else {
            panic!("expected malformed payload, got {outcome:?}");
        };
        assert_eq!(raw, text);
    }

    #[test]
    fn empty_array_is_not_an_array_of_objects() {
        assert!(matches!(
            extract_insights("Nothing to report: []"),
            ExtractionOutcome::ExtractionFailed(_)
        ));
    }

    #[test]
    fn missing_zones_default_and_extra_zones_are_truncated() {
        let text = r#"[
            {"id": "a", "insight": "Dense canopy", "priority": "Low"},
            {"id": "b", "insight": "Heavy loss", "priority": "High", "restoration_zones": [
                {"lat": 1, "lng": 2, "radius_km": 1},
                {"lat": 3, "lng": 4, "radius_km": 2},
                {"lat": 5, "lng": 6, "radius_km": 3}
            ]}
        ]"#;

        let insights = extract_insights(text).into_result().unwrap();

        assert!(insights[0].restoration_zones.is_empty());
        assert_eq!(insights[1].restoration_zones.len(), 2);
        assert!((insights[1].restoration_zones[1].radius_km - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrecognized_priority_passes_through() {
        let text = r#"[{"id": "a", "insight": "", "priority": "Critical"}]"#;

        let insights = extract_insights(text).into_result().unwrap();

        assert_eq!(insights[0].priority, Priority::Other("Critical".to_string()));
    }

    #[test]
    fn emitted_order_is_preserved() {
        let text = r#"[{"id": "z", "priority": "Low"}, {"id": "a", "priority": "High"}]"#;

        let ids: Vec<_> = extract_insights(text)
            .into_result()
            .unwrap()
            .into_iter()
            .map(|i| i.region_id.to_string())
            .collect();

        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn element_without_id_is_skipped_and_the_rest_kept() {
        let text = r#"[{"id":"a","priority":"High","restoration_zones":[]},{"insight":"no id","priority":"Low"}]"#;

        let insights = extract_insights(text).into_result().unwrap();

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].region_id.as_str(), "a");
        assert_eq!(insights[0].priority, Priority::High);
    }

    #[test]
    fn non_object_and_blank_id_elements_are_skipped() {
        let text = r#"[{"id": "  ", "priority": "Low"}, {"id": "b", "priority": "Low"}, 3]"#;

        let insights = extract_insights(text).into_result().unwrap();

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].region_id.as_str(), "b");
    }

    #[test]
    fn non_string_priority_passes_through_as_text() {
        let text = r#"[{"id":"a","priority":"High"},{"id":"b","priority":2}]"#;

        let insights = extract_insights(text).into_result().unwrap();

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].priority, Priority::High);
        assert_eq!(insights[1].priority, Priority::Other("2".to_string()));
    }

    #[test]
    fn missing_priority_is_an_empty_label() {
        let insights = extract_insights(r#"[{"id": "a", "insight": "ok"}]"#)
            .into_result()
            .unwrap();

        assert_eq!(insights[0].priority, Priority::Other(String::new()));
        assert_eq!(insights[0].summary, "ok");
    }

    #[test]
    fn unparseable_zones_are_skipped() {
        let text = r#"[
            {"id": "a", "priority": "High", "restoration_zones": [
                {"lat": 1, "lng": 2, "radius_km": "5"},
                {"lat": 3, "lng": 4},
                {"lat": 5, "lng": 6, "radius_km": 7}
            ]},
            {"id": "b", "priority": "Low", "restoration_zones": "none"}
        ]"#;

        let insights = extract_insights(text).into_result().unwrap();

        assert_eq!(insights.len(), 2);
        assert_eq!(
            insights[0].restoration_zones,
            vec![RestorationZone {
                lat: 5.0,
                lng: 6.0,
                radius_km: 7.0,
            }]
        );
        assert!(insights[1].restoration_zones.is_empty());
    }

    #[test]
    fn numeric_id_and_non_string_insight_are_kept() {
        let text = r#"[{"id": 1712345678901, "insight": {"loss": "high"}, "priority": "medium"}]"#;

        let insights = extract_insights(text).into_result().unwrap();

        assert_eq!(insights[0].region_id.as_str(), "1712345678901");
        assert_eq!(insights[0].summary, r#"{"loss":"high"}"#);
        assert_eq!(insights[0].priority, Priority::Medium);
    }

    #[test]
    fn bracketed_preamble_widens_the_first_match() {
        let text = "See [{note}] then [{\"id\":\"a\",\"priority\":\"High\"}]";

        assert_eq!(
            locate_array(text),
            Some("[{note}] then [{\"id\":\"a\",\"priority\":\"High\"}]")
        );
        let outcome = extract_insights(text);
        let ExtractionOutcome::MalformedPayload { raw, .. } = outcome else {
            panic!("expected malformed payload, got {outcome:?}");
        };
        assert!(raw.starts_with("[{note}]"));
    }

    #[test]
    fn untyped_extraction_returns_the_array_as_is() {
        let value = extract_json("ok:\n[{\"id\": 7, \"extra\": true}]").unwrap();

        assert_eq!(value, serde_json::json!([{ "id": 7, "extra": true }]));
    }

    #[test]
    fn untyped_extraction_classifies_failures() {
        assert!(matches!(
            extract_json("no array here"),
            Err(InsightError::ExtractionFailed { raw }) if raw == "no array here"
        ));
        assert!(matches!(
            extract_json("[{oops}]"),
            Err(InsightError::MalformedPayload { raw, .. }) if raw == "[{oops}]"
        ));
    }
}
