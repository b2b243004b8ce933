//! Plain-text source summaries.
//!
//! The rendering layer proper (cards, line charts) is an external
//! consumer of [`SourceState`]; this module is the minimal built-in
//! stand-in, producing one status line per source.

use std::fmt::Write;

use sensorwatch_types::{SourceState, SourceStatus};

/// Summarize a source state as a single line.
pub fn summarize(name: &str, state: &SourceState) -> String {
    match state.status() {
        SourceStatus::Loading => format!("{name}: loading..."),
        SourceStatus::Error => {
            let message = state.error.as_deref().unwrap_or("unknown error");
            format!("{name}: error: {message}")
        }
        SourceStatus::NoData => format!("{name}: no data available"),
        SourceStatus::Ready => {
            let mut line = format!("{name}:");
            if let Some(latest) = &state.latest {
                let _ = write!(line, " [{}]", latest.point.time);
                for (key, value) in &latest.point.metrics {
                    let _ = write!(line, " {key}={value:.2}");
                }
            }
            let _ = write!(line, " ({} history rows)", state.history.len());
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorwatch_types::{LatestSnapshot, MetricPoint, SeriesBuilder, SourceState};

    #[test]
    fn test_loading_line() {
        assert_eq!(summarize("push", &SourceState::loading()), "push: loading...");
    }

    #[test]
    fn test_error_line() {
        let state = SourceState::failed("Connection failed: refused");
        assert_eq!(summarize("plant", &state), "plant: error: Connection failed: refused");
    }

    #[test]
    fn test_no_data_line() {
        assert_eq!(summarize("push", &SourceState::no_data()), "push: no data available");
    }

    #[test]
    fn test_ready_line() {
        let mut point = MetricPoint::new(0);
        point.set("flow", 2.5);
        point.set("pressure", 1.0);
        let time = point.time.clone();

        let mut builder = SeriesBuilder::new();
        builder.observe(0, "flow", 2.5);

        let state = SourceState::ready(
            Some(LatestSnapshot::new("plant", "100", point)),
            builder.build(),
        );

        assert_eq!(
            summarize("plant", &state),
            format!("plant: [{time}] flow=2.50 pressure=1.00 (1 history rows)")
        );
    }
}
