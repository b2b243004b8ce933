//! MetricPoint - one timestamped row of named numeric metrics.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone};

/// Placeholder label for timestamps outside chrono's representable range.
const INVALID_TIME_LABEL: &str = "--:--";

/// One timestamped row of one or more named numeric metrics.
///
/// This is the unit every adapter normalizes into. The `metrics` map is
/// sparse: only metrics observed at this timestamp are present, and the
/// rendering layer treats missing keys as gaps, not zero.
///
/// With the `serde` feature enabled, metrics are flattened into the row,
/// producing the `{timestamp, time, <metric>: number}` shape a chart
/// consumes directly:
///
/// ```json
/// {"timestamp": 1000, "time": "14:30", "pressure": 1.2, "flow": 4.5}
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricPoint {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,

    /// Localized `HH:MM` label derived from the timestamp.
    pub time: String,

    /// Named metric values observed at this timestamp.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub metrics: BTreeMap<String, f64>,
}

impl MetricPoint {
    /// Create an empty point at the given timestamp, with its time label
    /// derived from the timestamp.
    pub fn new(timestamp_ms: i64) -> Self {
        Self {
            timestamp: timestamp_ms,
            time: time_label(timestamp_ms),
            metrics: BTreeMap::new(),
        }
    }

    /// Set a metric value. Non-finite values are discarded so that NaN or
    /// infinity never reaches a chart row.
    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.metrics.insert(key.into(), value);
        }
    }

    /// Get a metric value by key.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    /// Check whether the point carries any metrics.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Format an epoch-millisecond timestamp as a localized `HH:MM` label.
pub fn time_label(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => INVALID_TIME_LABEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_point_has_time_label() {
        let point = MetricPoint::new(1_000_000);
        assert_eq!(point.timestamp, 1_000_000);
        assert_eq!(point.time.len(), 5);
        assert!(point.is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let mut point = MetricPoint::new(0);
        point.set("pressure", 1.5);
        assert_eq!(point.get("pressure"), Some(1.5));
        assert_eq!(point.get("flow"), None);
    }

    #[test]
    fn test_non_finite_values_discarded() {
        let mut point = MetricPoint::new(0);
        point.set("a", f64::NAN);
        point.set("b", f64::INFINITY);
        point.set("c", f64::NEG_INFINITY);
        assert!(point.is_empty());
    }

    #[test]
    fn test_time_label_out_of_range() {
        assert_eq!(time_label(i64::MAX), INVALID_TIME_LABEL);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_metrics_flatten_into_row() {
        let mut point = MetricPoint::new(1_000);
        point.set("pressure", 1.2);

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["timestamp"], 1_000);
        assert_eq!(json["pressure"], 1.2);
        assert!(json.get("metrics").is_none());
    }
}
