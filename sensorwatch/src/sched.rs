//! Per-source scheduling.
//!
//! Each source runs as one independent tokio task that publishes
//! [`SourceState`] through a `tokio::sync::watch` channel. Sources never
//! share state: one source's failure cannot block or clear another's
//! data, and a newer fetch cycle's result fully replaces the prior one.
//!
//! Cadences differ per source, matching each upstream's contract:
//!
//! - **push**: purely subscription-driven; reduces every delivered
//!   collection
//! - **plant**: refetches only when the selected plant changes
//! - **weather**: fixed interval, guarded by a single-slot in-flight
//!   token - a tick while a fetch is outstanding is dropped, not queued
//!
//! There is no retry or backoff: a failed fetch surfaces an error state
//! and the next scheduled trigger is the only retry mechanism.
//! [`SourceWorker::shutdown`] aborts the task, which drops its
//! subscription and pending timers so nothing fires after teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use sensorwatch_adapters::ambient::AmbientAdapter;
use sensorwatch_adapters::push::{PushAdapter, PushSource};
use sensorwatch_adapters::ubidots::{PlantConfig, PlantData, UbidotsAdapter};
use sensorwatch_types::{LatestSnapshot, MetricPoint, SourceState};

/// Handle to one running source task and its published state.
#[derive(Debug)]
pub struct SourceWorker {
    rx: watch::Receiver<SourceState>,
    task: JoinHandle<()>,
}

impl SourceWorker {
    /// A receiver for observing state changes.
    pub fn state(&self) -> watch::Receiver<SourceState> {
        self.rx.clone()
    }

    /// The most recently published state.
    pub fn latest(&self) -> SourceState {
        self.rx.borrow().clone()
    }

    /// Tear the source down. Aborting the task drops its subscription
    /// and clears pending timers.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Spawn the push-source worker: reduce every delivered collection.
///
/// The worker owns the subscription; tearing the worker down drops it,
/// which is the unsubscribe.
pub fn spawn_push(adapter: PushAdapter, mut source: PushSource) -> SourceWorker {
    let (tx, rx) = watch::channel(SourceState::loading());

    let task = tokio::spawn(async move {
        info!("push `{}`: subscribed", adapter.label());
        while let Some(collection) = source.next_update().await {
            let state = match adapter.reduce(&collection) {
                Ok(Some(frame)) => SourceState::ready(Some(frame.latest), frame.history),
                Ok(None) => {
                    info!("push `{}`: no data available", adapter.label());
                    SourceState::no_data()
                }
                Err(e) => {
                    warn!("push `{}`: {}", adapter.label(), e);
                    SourceState::failed(e.to_string())
                }
            };
            if tx.send(state).is_err() {
                break;
            }
        }
    });

    SourceWorker { rx, task }
}

/// Spawn the plant worker: one full collection cycle now, then again
/// whenever the selected plant changes. No periodic refresh.
pub fn spawn_plant(
    adapter: UbidotsAdapter,
    mut plant_rx: watch::Receiver<PlantConfig>,
) -> SourceWorker {
    let (tx, rx) = watch::channel(SourceState::loading());

    let task = tokio::spawn(async move {
        loop {
            let plant = plant_rx.borrow_and_update().clone();
            info!("plant `{}`: collecting", plant.name);
            let _ = tx.send(SourceState::loading());

            let state = match adapter.collect(&plant).await {
                Ok(data) => plant_state(&plant, data),
                Err(e) => {
                    warn!("plant `{}`: {}", plant.name, e);
                    SourceState::failed(e.to_string())
                }
            };
            if tx.send(state).is_err() {
                break;
            }

            if plant_rx.changed().await.is_err() {
                break;
            }
        }
    });

    SourceWorker { rx, task }
}

/// Spawn the weather worker: fetch on start, then on a fixed interval.
/// A tick while a fetch is outstanding is dropped.
pub fn spawn_weather(adapter: AmbientAdapter, poll_interval: Duration) -> SourceWorker {
    let (tx, rx) = watch::channel(SourceState::loading());
    let in_flight = InFlight::default();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let Some(guard) = in_flight.try_claim() else {
                debug!("weather: fetch already in flight, dropping tick");
                continue;
            };

            // Awaited in the worker task itself so that aborting the
            // worker cancels an in-flight fetch instead of letting it
            // publish after teardown. A fetch outlasting the interval
            // shows up as skipped ticks, never as queued retries.
            let state = match adapter.collect().await {
                Ok(Some(frame)) => SourceState::ready(Some(frame.latest), frame.history),
                Ok(None) => {
                    info!("weather `{}`: no data available", adapter.device_mac());
                    SourceState::no_data()
                }
                Err(e) => {
                    warn!("weather `{}`: {}", adapter.device_mac(), e);
                    SourceState::failed(e.to_string())
                }
            };
            drop(guard);

            if tx.send(state).is_err() {
                break;
            }
        }
    });

    SourceWorker { rx, task }
}

/// A worker that only ever publishes one fixed state. Used for terminal
/// conditions (missing weather credentials, no plants configured) so the
/// consumer surface stays uniform across sources.
pub fn static_source(state: SourceState) -> SourceWorker {
    let (tx, rx) = watch::channel(state);
    let task = tokio::spawn(async move {
        tx.closed().await;
    });
    SourceWorker { rx, task }
}

/// Assemble a plant cycle's consumer state. Latest values form one
/// now-stamped snapshot; "not available" sentinels stay absent.
pub fn plant_state(plant: &PlantConfig, data: PlantData) -> SourceState {
    let mut point = MetricPoint::new(Utc::now().timestamp_millis());
    for (key, value) in &data.latest_values {
        if let Some(value) = *value {
            point.set(key.clone(), value);
        }
    }

    if point.is_empty() && data.history.is_empty() {
        return SourceState::no_data();
    }

    let latest = LatestSnapshot::new(plant.name.clone(), plant.id.clone(), point);
    SourceState::ready(Some(latest), data.history)
}

/// Single-slot in-flight token: at most one outstanding fetch per
/// adapter instance. A claim while occupied is a no-op for the caller,
/// never a queued retry.
#[derive(Debug, Clone, Default)]
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    /// Claim the slot. Returns `None` while a prior claim is live.
    fn try_claim(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(self.0.clone()))
    }
}

/// Releases the in-flight slot on drop.
#[derive(Debug)]
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorwatch_types::{SeriesBuilder, SourceStatus};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_in_flight_single_slot() {
        let in_flight = InFlight::default();

        let guard = in_flight.try_claim().unwrap();
        assert!(in_flight.try_claim().is_none());

        drop(guard);
        assert!(in_flight.try_claim().is_some());
    }

    #[test]
    fn test_plant_state_ready() {
        let plant = test_plant();
        let mut latest_values = BTreeMap::new();
        latest_values.insert("pressure".to_string(), Some(1.2));
        latest_values.insert("flow".to_string(), None);

        let mut builder = SeriesBuilder::new();
        builder.observe(1_000, "pressure", 1.1);

        let state = plant_state(&plant, PlantData {
            latest_values,
            history: builder.build(),
        });

        assert_eq!(state.status(), SourceStatus::Ready);
        let latest = state.latest.unwrap();
        assert_eq!(latest.source, "Planta Temuco");
        assert_eq!(latest.value("pressure"), Some(1.2));
        // The unavailable variable stays absent, not zero.
        assert_eq!(latest.value("flow"), None);
    }

    #[test]
    fn test_plant_state_no_data() {
        let plant = test_plant();
        let mut latest_values = BTreeMap::new();
        latest_values.insert("pressure".to_string(), None);

        let state = plant_state(&plant, PlantData {
            latest_values,
            history: sensorwatch_types::UnifiedSeries::empty(),
        });
        assert_eq!(state.status(), SourceStatus::NoData);
    }

    #[tokio::test]
    async fn test_push_worker_lifecycle() {
        let (handle, source) = PushSource::channel("test");
        let worker = spawn_push(PushAdapter::new("test"), source);
        assert_eq!(worker.latest().status(), SourceStatus::Loading);

        let mut rx = worker.state();

        let mut collection = BTreeMap::new();
        collection.insert(
            "100".to_string(),
            serde_json::from_value(json!({"pressure": 1.0, "flow": 2.0, "rssi": -50})).unwrap(),
        );
        assert!(handle.publish(collection));

        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.status(), SourceStatus::Ready);
        assert_eq!(state.history.len(), 1);

        // An empty delivery replaces the prior state with no-data.
        assert!(handle.publish(BTreeMap::new()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().status(), SourceStatus::NoData);

        worker.shutdown();
    }

    #[tokio::test]
    async fn test_push_worker_surfaces_processing_error() {
        let (handle, source) = PushSource::channel("test");
        let worker = spawn_push(PushAdapter::new("test"), source);
        let mut rx = worker.state();

        let mut collection = BTreeMap::new();
        collection.insert("bogus".to_string(), BTreeMap::new());
        assert!(handle.publish(collection));

        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.status(), SourceStatus::Error);
        assert!(state.error.unwrap().contains("bogus"));
        assert!(state.history.is_empty());

        worker.shutdown();
    }

    #[tokio::test]
    async fn test_plant_worker_refetches_only_on_plant_change() {
        // A plant with no sensors completes a cycle without any network
        // traffic: empty latest values, empty history, so no-data.
        let (plant_tx, plant_rx) = watch::channel(test_plant());
        let worker = spawn_plant(UbidotsAdapter::builder().build(), plant_rx);
        let mut rx = worker.state();

        // The initial cycle runs on spawn.
        rx.wait_for(|s| s.status() == SourceStatus::NoData).await.unwrap();

        // No periodic refresh: nothing is published while the selected
        // plant stays the same.
        let idle = tokio::time::timeout(Duration::from_millis(200), rx.changed()).await;
        assert!(idle.is_err(), "published without a plant change");

        // Selecting a different plant triggers a fresh cycle.
        let mut other = test_plant();
        other.id = "osorno".to_string();
        other.name = "Planta Osorno".to_string();
        plant_tx.send(other).unwrap();

        let refetch = tokio::time::timeout(Duration::from_secs(1), rx.changed()).await;
        assert!(refetch.expect("no refetch after plant change").is_ok());
        tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| s.status() == SourceStatus::NoData),
        )
        .await
        .expect("plant change cycle did not complete")
        .unwrap();

        worker.shutdown();
    }

    #[tokio::test]
    async fn test_weather_shutdown_cancels_in_flight_fetch() {
        // A backend that accepts connections but never answers, so the
        // fetch is still outstanding when the worker is torn down.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let adapter = AmbientAdapter::builder()
            .base_url(format!("http://{addr}"))
            .api_key("key")
            .application_key("app-key")
            .device_mac("AA:BB:CC:DD:EE:FF")
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();

        let worker = spawn_weather(adapter, Duration::from_secs(60));
        let mut rx = worker.state();

        tokio::time::sleep(Duration::from_millis(100)).await;
        worker.shutdown();

        // Teardown cancels the outstanding fetch: the channel closes
        // without ever publishing past the initial loading state. The
        // window is well past the client timeout, so a surviving fetch
        // would have published its error state within it.
        let changed = tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("channel neither closed nor published");
        assert!(changed.is_err(), "state published after shutdown");
        assert_eq!(rx.borrow().status(), SourceStatus::Loading);
    }

    #[tokio::test]
    async fn test_static_source() {
        let worker = static_source(SourceState::failed("weather station: missing API key"));
        let state = worker.latest();
        assert_eq!(state.status(), SourceStatus::Error);
        worker.shutdown();
    }

    fn test_plant() -> PlantConfig {
        PlantConfig {
            id: "temuco".to_string(),
            name: "Planta Temuco".to_string(),
            sensors: Vec::new(),
        }
    }
}
