//! LatestSnapshot - the most recent observation for "current reading" displays.

use crate::MetricPoint;

/// The most recent observation from one source, augmented with the source
/// label and the raw upstream timestamp it was delivered under.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatestSnapshot {
    /// Source or device label (e.g. a push collection path, a plant name,
    /// a weather station MAC).
    pub source: String,

    /// The timestamp exactly as the upstream delivered it - a numeric
    /// string key for push collections, a date string for the weather API.
    pub raw_timestamp: String,

    /// The observation itself.
    pub point: MetricPoint,
}

impl LatestSnapshot {
    /// Create a snapshot from a source label, the raw upstream timestamp,
    /// and the observed point.
    pub fn new(
        source: impl Into<String>,
        raw_timestamp: impl Into<String>,
        point: MetricPoint,
    ) -> Self {
        Self {
            source: source.into(),
            raw_timestamp: raw_timestamp.into(),
            point,
        }
    }

    /// Get a metric value from the snapshot by key.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.point.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_keeps_raw_timestamp() {
        let mut point = MetricPoint::new(200_000);
        point.set("pressure", 1.5);

        let snapshot = LatestSnapshot::new("plant-a", "200", point);
        assert_eq!(snapshot.raw_timestamp, "200");
        assert_eq!(snapshot.value("pressure"), Some(1.5));
        assert_eq!(snapshot.value("flow"), None);
    }
}
