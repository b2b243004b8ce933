//! # sensorwatch-types
//!
//! Core types for multi-source sensor telemetry. This crate defines the
//! universal time-series schema that every upstream source (push database,
//! REST-polled IoT platform, weather station) is normalized into, so that
//! one rendering layer can consume them all.
//!
//! ## Design Goals
//!
//! - **Source agnostic**: adapters for any backend produce the same
//!   [`MetricPoint`] / [`UnifiedSeries`] shapes
//! - **Sparse by construction**: a row only carries the metrics actually
//!   observed at its timestamp; missing metrics are gaps, never zeros
//! - **Chart safe**: a metric value is always a finite number or absent,
//!   never NaN or infinity
//! - **Optional serialization**: enable the `serde` feature to ship rows
//!   to a JSON-consuming renderer
//!
//! ## Example
//!
//! ```rust
//! use sensorwatch_types::SeriesBuilder;
//!
//! let mut builder = SeriesBuilder::new();
//! builder.observe(1_000, "pressure", 1.2);
//! builder.observe(1_000, "flow", 4.5);
//! builder.observe(2_000, "flow", 4.7);
//!
//! let series = builder.build();
//! assert_eq!(series.len(), 2);
//! assert_eq!(series.as_slice()[0].get("pressure"), Some(1.2));
//! assert_eq!(series.as_slice()[1].get("pressure"), None);
//! ```

mod point;
mod series;
mod snapshot;
mod state;

pub use point::*;
pub use series::*;
pub use snapshot::*;
pub use state::*;
