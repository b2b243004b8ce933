//! Weather-station adapter for the Ambient Weather device API.
//!
//! A single authenticated request returns an array of historical samples,
//! newest first. The adapter converts each sample's imperial fields to
//! metric, sorts ascending by timestamp, and takes the last row after
//! sorting as the latest reading.
//!
//! ## Metrics Produced
//!
//! - `tempc` - temperature, °F converted to °C
//! - `humidity` - relative humidity, passed through
//! - `baromrelhpa` - relative pressure, inHg converted to hPa
//! - `windspeedkmh` - wind speed, mph converted to km/h
//! - `dailyrainmm` - daily rain, inches converted to mm
//! - `winddir` - wind direction in degrees, passed through
//!
//! Credentials are validated at build time: a missing API key, application
//! key, or device MAC is a terminal configuration error, not a transient
//! fetch error, and callers must not retry it.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use sensorwatch_types::{LatestSnapshot, SeriesBuilder, UnifiedSeries};

use crate::convert::{fahrenheit_to_celsius, inches_to_mm, inhg_to_hpa, mph_to_kmh};
use crate::AdapterError;

/// Default Ambient Weather API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.ambientweather.net/v1";

/// Default number of samples requested (the upstream cap).
pub const DEFAULT_SAMPLE_LIMIT: u32 = 288;

/// One converted fetch: latest reading plus ascending history.
#[derive(Debug, Clone)]
pub struct WeatherFrame {
    /// The newest sample, after sorting.
    pub latest: LatestSnapshot,
    /// All returned samples, ascending by timestamp.
    pub history: UnifiedSeries,
}

/// Adapter polling one weather station device.
#[derive(Debug, Clone)]
pub struct AmbientAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    application_key: String,
    device_mac: String,
    limit: u32,
}

impl AmbientAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> AmbientAdapterBuilder {
        AmbientAdapterBuilder::default()
    }

    /// The device this adapter polls.
    pub fn device_mac(&self) -> &str {
        &self.device_mac
    }

    /// Fetch and convert the device's recent samples.
    ///
    /// Returns `Ok(None)` when the device exists but has no samples - the
    /// no-data condition, distinct from an error.
    pub async fn collect(&self) -> Result<Option<WeatherFrame>, AdapterError> {
        let url = format!("{}/devices/{}", self.base_url, self.device_mac);
        let limit = self.limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("applicationKey", self.application_key.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdapterError::Auth("Invalid weather API credentials".to_string()));
        }

        if !response.status().is_success() {
            return Err(AdapterError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let samples: Vec<DeviceSample> = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(frame_from_samples(&self.device_mac, &samples))
    }
}

/// Convert raw device samples into a frame. Samples arrive newest first;
/// the builder re-sorts ascending and the last row becomes the latest.
fn frame_from_samples(device_mac: &str, samples: &[DeviceSample]) -> Option<WeatherFrame> {
    if samples.is_empty() {
        return None;
    }

    let mut builder = SeriesBuilder::new();
    for sample in samples {
        let ts = sample.dateutc;
        if let Some(tempf) = sample.tempf {
            builder.observe(ts, "tempc", fahrenheit_to_celsius(tempf));
        }
        if let Some(humidity) = sample.humidity {
            builder.observe(ts, "humidity", humidity);
        }
        if let Some(baromrelin) = sample.baromrelin {
            builder.observe(ts, "baromrelhpa", inhg_to_hpa(baromrelin));
        }
        if let Some(windspeedmph) = sample.windspeedmph {
            builder.observe(ts, "windspeedkmh", mph_to_kmh(windspeedmph));
        }
        if let Some(dailyrainin) = sample.dailyrainin {
            builder.observe(ts, "dailyrainmm", inches_to_mm(dailyrainin));
        }
        if let Some(winddir) = sample.winddir {
            builder.observe(ts, "winddir", winddir);
        }
    }

    let history = builder.build();
    let latest_point = history.last()?.clone();
    let raw_timestamp = samples
        .iter()
        .max_by_key(|s| s.dateutc)
        .and_then(|s| s.date.clone())
        .unwrap_or_else(|| latest_point.timestamp.to_string());

    Some(WeatherFrame {
        latest: LatestSnapshot::new(device_mac, raw_timestamp, latest_point),
        history,
    })
}

/// One raw sample from the device endpoint. Fields the station does not
/// report are simply absent and stay absent in the output.
#[derive(Debug, Deserialize)]
struct DeviceSample {
    /// Sample time, epoch milliseconds UTC.
    dateutc: i64,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    tempf: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    baromrelin: Option<f64>,
    #[serde(default)]
    windspeedmph: Option<f64>,
    #[serde(default)]
    dailyrainin: Option<f64>,
    #[serde(default)]
    winddir: Option<f64>,
}

/// Builder for [`AmbientAdapter`]. Credentials are required; `build`
/// fails with a terminal [`AdapterError::Config`] when any is missing.
#[derive(Debug, Default)]
pub struct AmbientAdapterBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    application_key: Option<String>,
    device_mac: Option<String>,
    limit: Option<u32>,
    timeout: Option<Duration>,
}

impl AmbientAdapterBuilder {
    /// Set the API base URL (default: the public endpoint).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the account API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the application key.
    pub fn application_key(mut self, application_key: impl Into<String>) -> Self {
        self.application_key = Some(application_key.into());
        self
    }

    /// Set the device MAC address to poll.
    pub fn device_mac(mut self, device_mac: impl Into<String>) -> Self {
        self.device_mac = Some(device_mac.into());
        self
    }

    /// Set the sample limit (default: 288).
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the adapter, validating that all credentials are present.
    pub fn build(self) -> Result<AmbientAdapter, AdapterError> {
        let api_key = require(self.api_key, "API key")?;
        let application_key = require(self.application_key, "application key")?;
        let device_mac = require(self.device_mac, "device MAC")?;

        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Ok(AmbientAdapter {
            client,
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            application_key,
            device_mac,
            limit: self.limit.unwrap_or(DEFAULT_SAMPLE_LIMIT),
        })
    }
}

fn require(value: Option<String>, what: &str) -> Result<String, AdapterError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AdapterError::Config(format!("weather station: missing {what}")))
}
