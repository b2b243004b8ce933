//! REST-polling adapter for the Ubidots-style IoT platform.
//!
//! One logical *plant* groups several sensors; each sensor owns a set of
//! tracked variables and its own API token. A collection cycle issues:
//!
//! - one "latest value" request per variable, all concurrently, joined
//!   all-or-nothing
//! - one "raw series" history request per sensor (not per variable),
//!   bundling that sensor's variable ids over a 24 hour lookback window
//!
//! The raw-series response is positionally aligned with the request's
//! variable list - no key is echoed back - so the decoder validates the
//! lengths match before zipping and treats a mismatch as a processing
//! error rather than silently misaligning data.
//!
//! Any failed request aborts the whole cycle and surfaces one aggregate
//! error; partial success is not surfaced distinctly. This mirrors the
//! upstream all-or-nothing contract and is a documented limitation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sensorwatch_adapters::ubidots::{PlantConfig, SensorConfig, UbidotsAdapter, VariableConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = UbidotsAdapter::builder().build();
//!     let plant = PlantConfig {
//!         id: "plant-a".into(),
//!         name: "Plant A".into(),
//!         sensors: vec![SensorConfig {
//!             name: "pump-1".into(),
//!             token: "TOKEN".into(),
//!             variables: vec![VariableConfig { key: "pressure".into(), id: "abc123".into() }],
//!         }],
//!     };
//!     let data = adapter.collect(&plant).await?;
//!     println!("{} history rows", data.history.len());
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use sensorwatch_types::{SeriesBuilder, UnifiedSeries};

use crate::AdapterError;

/// Default Ubidots industrial API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://industrial.api.ubidots.com/api/v1.6";

/// Per-sensor bearer-style token header.
const TOKEN_HEADER: &str = "X-Auth-Token";

/// Columns requested from the raw-series endpoint.
const RAW_SERIES_COLUMNS: [&str; 2] = ["value.value", "timestamp"];

/// History lookback window: 24 hours, in milliseconds.
const LOOKBACK_MS: i64 = 24 * 60 * 60 * 1_000;

/// A logical group of sensors polled together.
#[derive(Debug, Clone, Deserialize)]
pub struct PlantConfig {
    /// Stable identifier used for selection.
    pub id: String,
    /// Display name, stamped onto snapshots.
    pub name: String,
    /// Sensors in this plant.
    pub sensors: Vec<SensorConfig>,
}

/// One physical sensor: its API token and tracked variables.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    /// Token sent in the per-sensor auth header.
    pub token: String,
    pub variables: Vec<VariableConfig>,
}

/// One tracked variable: the metric key it charts under and its upstream id.
#[derive(Debug, Clone, Deserialize)]
pub struct VariableConfig {
    /// Metric key on output rows (e.g. "pressure").
    pub key: String,
    /// Upstream variable identifier.
    pub id: String,
}

/// One collection cycle's result for a plant.
#[derive(Debug, Clone)]
pub struct PlantData {
    /// Latest value per variable key. `None` means the upstream was
    /// reachable but returned no rows for that variable - the "not
    /// available" sentinel, kept out of the numeric domain.
    pub latest_values: BTreeMap<String, Option<f64>>,
    /// Cross-sensor merged history, ascending by raw upstream timestamp.
    pub history: UnifiedSeries,
}

/// Adapter polling the REST IoT platform.
#[derive(Debug, Clone)]
pub struct UbidotsAdapter {
    client: Client,
    base_url: String,
}

impl UbidotsAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> UbidotsAdapterBuilder {
        UbidotsAdapterBuilder::default()
    }

    /// Run one full collection cycle for a plant.
    pub async fn collect(&self, plant: &PlantConfig) -> Result<PlantData, AdapterError> {
        let latest_values = self.fetch_latest_values(plant).await?;
        let history = self.fetch_history(plant).await?;
        Ok(PlantData {
            latest_values,
            history,
        })
    }

    /// Fetch the latest value of every tracked variable in the plant.
    ///
    /// All requests are issued concurrently and joined all-or-nothing:
    /// one failure fails the cycle and no partial map is surfaced.
    pub async fn fetch_latest_values(
        &self,
        plant: &PlantConfig,
    ) -> Result<BTreeMap<String, Option<f64>>, AdapterError> {
        let requests = plant.sensors.iter().flat_map(|sensor| {
            sensor
                .variables
                .iter()
                .map(move |variable| self.fetch_latest_value(&sensor.token, variable))
        });
        assemble_latest(join_all(requests).await)
    }

    async fn fetch_latest_value(
        &self,
        token: &str,
        variable: &VariableConfig,
    ) -> Result<(String, Option<f64>), AdapterError> {
        let url = format!("{}/variables/{}/values", self.base_url, variable.id);

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, token)
            .query(&[("page_size", "1")])
            .send()
            .await?;
        let response = check_status(response, &variable.id)?;

        let body: ValuesResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok((variable.key.clone(), body.results.first().map(|r| r.value)))
    }

    /// Fetch and merge the 24 hour history of every sensor in the plant.
    pub async fn fetch_history(&self, plant: &PlantConfig) -> Result<UnifiedSeries, AdapterError> {
        let end = Utc::now().timestamp_millis();
        let start = end - LOOKBACK_MS;

        let requests = plant
            .sensors
            .iter()
            .map(|sensor| self.fetch_sensor_series(sensor, start, end));
        let per_sensor: Vec<Vec<Observation>> =
            join_all(requests).await.into_iter().collect::<Result<_, _>>()?;

        // First variable to report a timestamp creates the row; the rest
        // augment it.
        let mut builder = SeriesBuilder::new();
        for observations in &per_sensor {
            for (timestamp_ms, key, value) in observations {
                builder.observe(*timestamp_ms, key, *value);
            }
        }
        Ok(builder.build())
    }

    async fn fetch_sensor_series(
        &self,
        sensor: &SensorConfig,
        start: i64,
        end: i64,
    ) -> Result<Vec<Observation>, AdapterError> {
        let ids: Vec<&str> = sensor.variables.iter().map(|v| v.id.as_str()).collect();
        let body = RawSeriesRequest {
            variables: &ids,
            columns: &RAW_SERIES_COLUMNS,
            join_dataframes: false,
            start,
            end,
        };

        let response = self
            .client
            .post(format!("{}/data/raw/series", self.base_url))
            .header(TOKEN_HEADER, &sensor.token)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, &sensor.name)?;

        let body: RawSeriesResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        decode_sensor_series(sensor, body)
    }
}

/// One decoded observation: (timestamp ms, variable key, value).
type Observation = (i64, String, f64);

fn check_status(
    response: reqwest::Response,
    subject: &str,
) -> Result<reqwest::Response, AdapterError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AdapterError::Auth(format!("token rejected for `{subject}`")));
    }
    if !status.is_success() {
        return Err(AdapterError::Http(format!(
            "API returned status {status} for `{subject}`"
        )));
    }
    Ok(response)
}

/// Join concurrently fetched latest values all-or-nothing: the first
/// failure fails the whole cycle and no partial map survives.
fn assemble_latest(
    results: Vec<Result<(String, Option<f64>), AdapterError>>,
) -> Result<BTreeMap<String, Option<f64>>, AdapterError> {
    results.into_iter().collect()
}

/// Decode one sensor's raw-series response.
///
/// Result sets come back positionally aligned with the requested variable
/// ids; a length mismatch means we cannot know which variable a set
/// belongs to, so it is rejected rather than zipped short.
fn decode_sensor_series(
    sensor: &SensorConfig,
    response: RawSeriesResponse,
) -> Result<Vec<Observation>, AdapterError> {
    if response.results.len() != sensor.variables.len() {
        return Err(AdapterError::Parse(format!(
            "sensor `{}`: {} result sets for {} requested variables",
            sensor.name,
            response.results.len(),
            sensor.variables.len()
        )));
    }

    let mut observations = Vec::new();
    for (variable, rows) in sensor.variables.iter().zip(response.results) {
        for row in rows {
            if let (Some(value), Some(timestamp_ms)) = (row.value(), row.timestamp_ms()) {
                observations.push((timestamp_ms, variable.key.clone(), value));
            }
        }
    }
    Ok(observations)
}

#[derive(Debug, Serialize)]
struct RawSeriesRequest<'a> {
    variables: &'a [&'a str],
    columns: &'a [&'a str],
    join_dataframes: bool,
    start: i64,
    end: i64,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    results: Vec<ValueEntry>,
}

#[derive(Debug, Deserialize)]
struct ValueEntry {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct RawSeriesResponse {
    #[serde(default)]
    results: Vec<Vec<RawRow>>,
}

/// One `[value, timestamp]` pair from the raw-series endpoint.
#[derive(Debug, Deserialize)]
struct RawRow(Option<f64>, Option<f64>);

impl RawRow {
    fn value(&self) -> Option<f64> {
        self.0.filter(|v| v.is_finite())
    }

    fn timestamp_ms(&self) -> Option<i64> {
        self.1.map(|t| t as i64)
    }
}

/// Builder for [`UbidotsAdapter`].
#[derive(Debug, Default)]
pub struct UbidotsAdapterBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl UbidotsAdapterBuilder {
    /// Set the API base URL (default: the industrial endpoint).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> UbidotsAdapter {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        UbidotsAdapter {
            client,
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}
