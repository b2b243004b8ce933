//! # sensorwatch-adapters
//!
//! Adapters that normalize heterogeneous telemetry backends into the
//! sensorwatch time-series schema.
//!
//! Each upstream speaks a different shape; every adapter here converts its
//! source's raw payload into the same [`UnifiedSeries`] / [`LatestSnapshot`]
//! form so one consumer can render them all.
//!
//! ## Supported Sources
//!
//! - **Push database** ([`push`]) - a keyed collection of timestamped
//!   records delivered whole on every update, via a subscription handle
//! - **REST-polled IoT platform** ([`ubidots`]) - per-variable latest
//!   values and per-sensor raw-series history over a 24 hour window
//! - **Weather station** ([`ambient`]) - authenticated device history with
//!   imperial-to-metric unit conversions
//!
//! ## Quick Start (weather station)
//!
//! ```rust,no_run
//! use sensorwatch_adapters::ambient::AmbientAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = AmbientAdapter::builder()
//!         .api_key("key")
//!         .application_key("app-key")
//!         .device_mac("AA:BB:CC:DD:EE:FF")
//!         .build()?;
//!
//!     if let Some(frame) = adapter.collect().await? {
//!         println!("latest temp: {:?}", frame.latest.value("tempc"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod ambient;
pub mod convert;
pub mod error;
pub mod push;
pub mod ubidots;

pub use error::AdapterError;

// Re-export types for convenience
pub use sensorwatch_types::{LatestSnapshot, MetricPoint, SeriesBuilder, UnifiedSeries};
