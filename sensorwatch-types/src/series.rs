//! UnifiedSeries - the merged, ascending-by-timestamp metric stream.

use std::collections::BTreeMap;

use crate::MetricPoint;

/// An ordered sequence of [`MetricPoint`]s, strictly ascending by timestamp
/// and unique per timestamp.
///
/// A series is produced by merging independent per-variable observations
/// through a [`SeriesBuilder`]; it cannot be constructed with out-of-order
/// or duplicate rows.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct UnifiedSeries {
    points: Vec<MetricPoint>,
}

impl UnifiedSeries {
    /// An empty series.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The rows in ascending timestamp order.
    pub fn as_slice(&self) -> &[MetricPoint] {
        &self.points
    }

    /// Iterate over rows in ascending timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = &MetricPoint> {
        self.points.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recent row, if any.
    pub fn last(&self) -> Option<&MetricPoint> {
        self.points.last()
    }
}

impl IntoIterator for UnifiedSeries {
    type Item = MetricPoint;
    type IntoIter = std::vec::IntoIter<MetricPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

/// Builder that merges timestamped observations into a [`UnifiedSeries`].
///
/// Observations from any number of variables or sensors are keyed by raw
/// timestamp. The first observation at a timestamp creates the row (seeded
/// with its formatted time label); later observations at the same timestamp
/// augment it. A repeated timestamp+key pair overwrites - last write wins.
///
/// # Example
///
/// ```rust
/// use sensorwatch_types::SeriesBuilder;
///
/// let mut builder = SeriesBuilder::new();
/// builder.observe(2_000, "flow", 4.7);
/// builder.observe(1_000, "pressure", 1.2);
/// builder.observe(1_000, "flow", 4.5);
///
/// let series = builder.build();
/// let rows = series.as_slice();
/// assert_eq!(rows[0].timestamp, 1_000);
/// assert_eq!(rows[0].metrics.len(), 2);
/// assert_eq!(rows[1].metrics.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SeriesBuilder {
    rows: BTreeMap<i64, MetricPoint>,
}

impl SeriesBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of `key` at `timestamp_ms`.
    ///
    /// Non-finite values are discarded (see [`MetricPoint::set`]).
    pub fn observe(&mut self, timestamp_ms: i64, key: &str, value: f64) {
        self.rows
            .entry(timestamp_ms)
            .or_insert_with(|| MetricPoint::new(timestamp_ms))
            .set(key, value);
    }

    /// Merge every metric of an existing point into the builder.
    pub fn observe_point(&mut self, point: &MetricPoint) {
        for (key, value) in &point.metrics {
            self.observe(point.timestamp, key, *value);
        }
    }

    /// Merge every row of an existing series into the builder.
    pub fn extend_series(&mut self, series: &UnifiedSeries) {
        for point in series.iter() {
            self.observe_point(point);
        }
    }

    /// Emit the merged rows as a series, ascending by timestamp.
    pub fn build(self) -> UnifiedSeries {
        UnifiedSeries {
            points: self.rows.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_emitted_ascending() {
        let mut builder = SeriesBuilder::new();
        builder.observe(3_000, "a", 3.0);
        builder.observe(1_000, "a", 1.0);
        builder.observe(2_000, "a", 2.0);

        let series = builder.build();
        let timestamps: Vec<i64> = series.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![1_000, 2_000, 3_000]);
    }

    #[test]
    fn test_sparse_columns() {
        let mut builder = SeriesBuilder::new();
        builder.observe(1_000, "pressure", 1.2);
        builder.observe(1_000, "flow", 4.5);
        builder.observe(2_000, "flow", 4.7);

        let series = builder.build();
        let rows = series.as_slice();
        assert_eq!(rows[0].get("pressure"), Some(1.2));
        assert_eq!(rows[0].get("flow"), Some(4.5));
        assert_eq!(rows[1].get("pressure"), None);
        assert_eq!(rows[1].get("flow"), Some(4.7));
    }

    #[test]
    fn test_last_write_wins() {
        let mut builder = SeriesBuilder::new();
        builder.observe(1_000, "a", 1.0);
        builder.observe(1_000, "a", 2.0);

        let series = builder.build();
        assert_eq!(series.len(), 1);
        assert_eq!(series.as_slice()[0].get("a"), Some(2.0));
    }

    #[test]
    fn test_unification_is_idempotent() {
        let mut builder = SeriesBuilder::new();
        builder.observe(1_000, "pressure", 1.2);
        builder.observe(2_000, "flow", 4.7);
        let series = builder.build();

        // Unifying a series with itself yields the same series.
        let mut again = SeriesBuilder::new();
        again.extend_series(&series);
        again.extend_series(&series);
        assert_eq!(again.build(), series);
    }

    #[test]
    fn test_round_trip_keys() {
        let input = vec![(1_000, "pressure", 1.0), (2_000, "flow", 2.0), (3_000, "rssi", -50.0)];

        let mut builder = SeriesBuilder::new();
        for (ts, key, value) in &input {
            builder.observe(*ts, key, *value);
        }
        let series = builder.build();

        // Every input key appears on some row, and no row carries a key
        // absent from the input.
        for (_, key, _) in &input {
            assert!(series.iter().any(|p| p.get(key).is_some()));
        }
        for point in series.iter() {
            for key in point.metrics.keys() {
                assert!(input.iter().any(|(_, k, _)| k == key));
            }
        }
    }

    #[test]
    fn test_empty_builder() {
        let series = SeriesBuilder::new().build();
        assert!(series.is_empty());
        assert!(series.last().is_none());
    }
}
