//! Application settings.
//!
//! The plant/sensor/variable registry, the push collection path, and the
//! weather station credentials are all explicit configuration passed to
//! the adapters at construction time - loaded from a TOML file layered
//! with environment variables, never compiled in.
//!
//! Environment variables use the `SENSORWATCH_` prefix with `__` as the
//! level separator, e.g. `SENSORWATCH_WEATHER__API_KEY=...`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use sensorwatch_adapters::ubidots::PlantConfig;

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "SENSORWATCH";

/// Default weather poll cadence in seconds.
const DEFAULT_WEATHER_POLL_SECS: u64 = 300;

/// Top-level application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Push database source.
    #[serde(default)]
    pub push: PushSettings,

    /// REST-polled plants. The first is selected unless the CLI names one.
    #[serde(default)]
    pub plants: Vec<PlantConfig>,

    /// Weather station source.
    #[serde(default)]
    pub weather: WeatherSettings,
}

/// Push database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PushSettings {
    /// Collection path in the push database; also the source label on
    /// snapshots.
    #[serde(default = "default_push_path")]
    pub path: String,

    /// Optional JSON file feeding the collection (see
    /// [`FilePushFeed`](crate::feed::FilePushFeed)). Without it the push
    /// source waits for collections published through the library API.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            path: default_push_path(),
            file: None,
        }
    }
}

fn default_push_path() -> String {
    "telemetry".to_string()
}

/// Weather station settings. Credentials are optional here; their absence
/// surfaces as a terminal configuration error on the weather source only.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSettings {
    pub api_key: Option<String>,
    pub application_key: Option<String>,
    pub device_mac: Option<String>,

    /// Poll cadence in seconds.
    #[serde(default = "default_weather_poll_secs")]
    pub poll_interval_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            application_key: None,
            device_mac: None,
            poll_interval_secs: default_weather_poll_secs(),
        }
    }
}

fn default_weather_poll_secs() -> u64 {
    DEFAULT_WEATHER_POLL_SECS
}

impl Settings {
    /// Load settings from a TOML file layered with environment variables.
    ///
    /// A missing file is not an error; the environment (and defaults)
    /// then supply everything.
    pub fn load(path: &Path) -> Result<Settings> {
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()
            .context("failed to load configuration")?;

        config.try_deserialize().context("invalid configuration")
    }

    /// Find a plant by id or name, or fall back to the first configured.
    pub fn select_plant(&self, wanted: Option<&str>) -> Result<Option<&PlantConfig>> {
        match wanted {
            None => Ok(self.plants.first()),
            Some(wanted) => self
                .plants
                .iter()
                .find(|p| p.id == wanted || p.name == wanted)
                .map(Some)
                .with_context(|| format!("no configured plant matches `{wanted}`")),
        }
    }
}
