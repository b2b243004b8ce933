//! Push-database adapter.
//!
//! The push upstream delivers the *entire* keyed collection on every
//! update, not a delta: a mapping of timestamp-key (a numeric string of
//! epoch seconds) to a loosely-shaped record. The adapter sorts the keys
//! numerically, picks the maximum key as the latest reading, and charts
//! the three tracked metrics with missing or non-numeric fields coerced
//! to 0.
//!
//! Subscriptions are modeled as a [`PushHandle`] / [`PushSource`] channel
//! pair. The producer side (a realtime database client, a file feed, a
//! test) publishes whole collections through the handle; dropping the
//! source is the unsubscribe, so an aborted consumer task cannot leak a
//! callback.
//!
//! ## Example
//!
//! ```rust
//! use sensorwatch_adapters::push::{PushAdapter, PushCollection, PushRecord};
//! use serde_json::json;
//!
//! let adapter = PushAdapter::new("plant-floor");
//!
//! let mut collection = PushCollection::new();
//! let record: PushRecord =
//!     serde_json::from_value(json!({"pressure": 1.5, "flow": 2.5, "rssi": -55})).unwrap();
//! collection.insert("200".to_string(), record);
//!
//! let frame = adapter.reduce(&collection).unwrap().unwrap();
//! assert_eq!(frame.latest.raw_timestamp, "200");
//! ```

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::watch;

use sensorwatch_types::{LatestSnapshot, MetricPoint, SeriesBuilder, UnifiedSeries};

use crate::AdapterError;

/// One raw record as delivered by the push database: arbitrary fields,
/// loosely typed.
pub type PushRecord = BTreeMap<String, Value>;

/// The whole keyed collection: timestamp-key (epoch seconds, as a string)
/// to record.
pub type PushCollection = BTreeMap<String, PushRecord>;

/// The metrics charted from push records. Missing or non-numeric fields
/// coerce to 0 for these keys.
pub const CHARTED_FIELDS: [&str; 3] = ["pressure", "flow", "rssi"];

/// Raw field holding elapsed activity in microseconds.
const ELAPSED_FIELD: &str = "elapsed_time_us";

/// Derived snapshot metric: elapsed activity in minutes.
const ACTIVE_MINUTES: &str = "active_minutes";

const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// A reduced push collection: latest reading plus merged history.
#[derive(Debug, Clone, PartialEq)]
pub struct PushFrame {
    /// The record under the maximum timestamp key.
    pub latest: LatestSnapshot,
    /// One row per key, ascending by timestamp.
    pub history: UnifiedSeries,
}

/// Adapter that reduces push collections into the common series shape.
#[derive(Debug, Clone)]
pub struct PushAdapter {
    label: String,
}

impl PushAdapter {
    /// Create an adapter labelled with the collection path it watches.
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    /// The source label stamped onto snapshots.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Reduce a whole delivered collection.
    ///
    /// Returns `Ok(None)` for an empty collection - the explicit no-data
    /// condition, distinct from an error. A non-numeric timestamp key is
    /// a processing error: the upstream contract keys strictly by epoch
    /// seconds.
    pub fn reduce(&self, collection: &PushCollection) -> Result<Option<PushFrame>, AdapterError> {
        if collection.is_empty() {
            return Ok(None);
        }

        // Keys are numeric strings; sort by numeric value, not lexically,
        // so "9" orders before "10".
        let mut keyed: Vec<(i64, &String, &PushRecord)> = Vec::with_capacity(collection.len());
        for (key, record) in collection {
            let seconds: i64 = key.trim().parse().map_err(|_| {
                AdapterError::Parse(format!("non-numeric timestamp key `{key}` in push collection"))
            })?;
            keyed.push((seconds, key, record));
        }
        keyed.sort_by_key(|(seconds, _, _)| *seconds);

        let mut builder = SeriesBuilder::new();
        for (seconds, _, record) in &keyed {
            let timestamp_ms = seconds * 1_000;
            for field in CHARTED_FIELDS {
                builder.observe(timestamp_ms, field, coerce(record.get(field)));
            }
        }

        let Some((seconds, key, record)) = keyed.last().copied() else {
            return Ok(None);
        };
        let mut point = MetricPoint::new(seconds * 1_000);
        for field in CHARTED_FIELDS {
            point.set(field, coerce(record.get(field)));
        }
        if let Some(elapsed_us) = record.get(ELAPSED_FIELD).and_then(Value::as_f64) {
            point.set(ACTIVE_MINUTES, elapsed_us / MICROS_PER_MINUTE);
        }

        Ok(Some(PushFrame {
            latest: LatestSnapshot::new(self.label.clone(), key.as_str(), point),
            history: builder.build(),
        }))
    }
}

/// Coerce a raw field to a chartable number: missing or non-numeric is 0.
fn coerce(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

/// Producer side of a push subscription.
///
/// Each `publish` replaces the previously delivered collection, matching
/// the upstream contract of full-collection updates.
#[derive(Debug, Clone)]
pub struct PushHandle {
    tx: watch::Sender<PushCollection>,
}

impl PushHandle {
    /// Deliver a whole collection to the subscriber.
    ///
    /// Returns false once the subscriber has unsubscribed (dropped its
    /// [`PushSource`]).
    pub fn publish(&self, collection: PushCollection) -> bool {
        self.tx.send(collection).is_ok()
    }

    /// True while the subscriber end is still alive.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Subscriber side of a push subscription.
///
/// Dropping the source closes the subscription; the owner must drop it on
/// teardown (aborting the task that owns it is enough).
#[derive(Debug)]
pub struct PushSource {
    rx: watch::Receiver<PushCollection>,
    description: String,
}

impl PushSource {
    /// Create a subscription pair for the given collection path.
    pub fn channel(path: &str) -> (PushHandle, PushSource) {
        let (tx, rx) = watch::channel(PushCollection::new());
        let source = PushSource {
            rx,
            description: format!("push: {path}"),
        };
        (PushHandle { tx }, source)
    }

    /// Wait for the next delivered collection.
    ///
    /// Returns `None` once the producer side has gone away.
    pub async fn next_update(&mut self) -> Option<PushCollection> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Returns a human-readable description of the subscription.
    pub fn description(&self) -> &str {
        &self.description
    }
}
