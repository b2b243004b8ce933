// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # sensorwatch
//!
//! A multi-source sensor telemetry watcher. Polls three heterogeneous
//! backends - a push database, a REST-polled IoT platform, and a weather
//! station API - normalizes their divergent payloads into one time-series
//! shape, and publishes per-source state for a rendering layer to consume.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Application                         │
//! │  ┌─────────┐    ┌──────────┐    ┌────────────────────────┐ │
//! │  │ config  │───▶│  sched   │───▶│ watch::Receiver<       │ │
//! │  │(settings)    │(workers) │    │   SourceState> per src │ │
//! │  └─────────┘    └────┬─────┘    └───────────┬────────────┘ │
//! │                      │                      ▼              │
//! │                ┌─────┴─────┐           ┌────────┐          │
//! │                │ adapters  │           │ report │          │
//! │                │push/rest/ │           │ (text) │          │
//! │                │ weather   │           └────────┘          │
//! │                └───────────┘                               │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`config`]**: typed settings (plant/sensor/variable registry, push
//!   path, weather credentials) loaded from a TOML file layered with
//!   `SENSORWATCH_`-prefixed environment variables
//! - **[`sched`]**: one independent worker per source, each publishing
//!   [`SourceState`](sensorwatch_types::SourceState) through a watch
//!   channel; teardown aborts the workers, which closes subscriptions and
//!   clears pending timers
//! - **[`feed`]**: file-backed push producer - re-reads a JSON collection
//!   file when its mtime changes and delivers it through the push handle
//! - **[`report`]**: one-line text summaries of source states, the
//!   minimal stand-in for a card/chart rendering layer
//!
//! ## Usage
//!
//! ```bash
//! # Watch all configured sources
//! sensorwatch --config sensorwatch.toml
//!
//! # One collection pass per pollable source, then exit
//! sensorwatch --config sensorwatch.toml --once
//! ```

pub mod config;
pub mod feed;
pub mod report;
pub mod sched;

pub use config::Settings;
pub use feed::FilePushFeed;
pub use sched::SourceWorker;
