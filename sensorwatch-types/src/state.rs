//! Consumer-facing per-source state.

use crate::{LatestSnapshot, UnifiedSeries};

/// What a source's consumer (card, chart, status line) sees: the latest
/// reading, the merged history, and the loading/error flags.
///
/// Each source publishes its own independent `SourceState`; one source's
/// failure never clears or blocks another's data. A newer fetch cycle's
/// state fully replaces the prior one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceState {
    /// Most recent observation, if any.
    pub latest: Option<LatestSnapshot>,

    /// Merged history, ascending by timestamp.
    pub history: UnifiedSeries,

    /// True while the first fetch of a cycle is outstanding.
    pub loading: bool,

    /// Error message from the last failed fetch, if any.
    pub error: Option<String>,
}

impl SourceState {
    /// Initial state: first fetch outstanding.
    pub fn loading() -> Self {
        Self {
            latest: None,
            history: UnifiedSeries::empty(),
            loading: true,
            error: None,
        }
    }

    /// Successful fetch. An empty result (no latest, no history) is the
    /// distinct no-data condition, not an error.
    pub fn ready(latest: Option<LatestSnapshot>, history: UnifiedSeries) -> Self {
        Self {
            latest,
            history,
            loading: false,
            error: None,
        }
    }

    /// Backend reachable but returned nothing.
    pub fn no_data() -> Self {
        Self::ready(None, UnifiedSeries::empty())
    }

    /// Failed fetch: the source's data is cleared and the message surfaced.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            latest: None,
            history: UnifiedSeries::empty(),
            loading: false,
            error: Some(message.into()),
        }
    }

    /// Classify the state for display.
    pub fn status(&self) -> SourceStatus {
        if self.loading {
            SourceStatus::Loading
        } else if self.error.is_some() {
            SourceStatus::Error
        } else if self.latest.is_none() && self.history.is_empty() {
            SourceStatus::NoData
        } else {
            SourceStatus::Ready
        }
    }
}

impl Default for SourceState {
    fn default() -> Self {
        Self::loading()
    }
}

/// Display classification of a [`SourceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// First fetch outstanding.
    Loading,
    /// Data available.
    Ready,
    /// Backend reachable, nothing returned.
    NoData,
    /// Last fetch failed.
    Error,
}

impl SourceStatus {
    /// Returns the display label for this status.
    pub fn label(&self) -> &'static str {
        match self {
            SourceStatus::Loading => "loading",
            SourceStatus::Ready => "ready",
            SourceStatus::NoData => "no data",
            SourceStatus::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MetricPoint, SeriesBuilder};

    #[test]
    fn test_status_transitions() {
        assert_eq!(SourceState::loading().status(), SourceStatus::Loading);
        assert_eq!(SourceState::no_data().status(), SourceStatus::NoData);
        assert_eq!(SourceState::failed("boom").status(), SourceStatus::Error);

        let mut builder = SeriesBuilder::new();
        builder.observe(1_000, "flow", 2.0);
        let state = SourceState::ready(None, builder.build());
        assert_eq!(state.status(), SourceStatus::Ready);
    }

    #[test]
    fn test_failed_clears_data() {
        let state = SourceState::failed("connection refused");
        assert!(state.latest.is_none());
        assert!(state.history.is_empty());
        assert_eq!(state.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_ready_with_latest_only() {
        let snapshot =
            crate::LatestSnapshot::new("plant", "now", MetricPoint::new(0));
        let state = SourceState::ready(Some(snapshot), UnifiedSeries::empty());
        assert_eq!(state.status(), SourceStatus::Ready);
    }
}
