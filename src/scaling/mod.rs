//! Scaling module — turns per-model statistics into scale events
//!
//! Provides the periodic stats analyser, the request-path collector that feeds
//! the keepers, and the dispatcher that drains scale events into a sink.

pub mod analyser;
pub mod collector;
pub mod dispatcher;

pub use analyser::{AnalyserState, StatsAnalyserService};
pub use collector::{setup_latch, SetupDone, SetupWait, StatsCollector};
pub use dispatcher::{spawn_dispatcher, LogSink, ScaleEventSink};

use crate::stats::{LogicOperation, ModelScalingStats, ModelStatsKV};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Direction of a scaling event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
    Up,
    Down,
}

impl std::fmt::Display for ScaleDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// A model crossed a threshold and should scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelScalingEvent {
    /// Direction the model should scale in
    pub event_type: ScaleDirection,
    /// Statistic that triggered the event
    pub stats_data: ModelStatsKV,
}

impl ModelScalingEvent {
    pub fn new(event_type: ScaleDirection, stats_data: ModelStatsKV) -> Self {
        Self {
            event_type,
            stats_data,
        }
    }

    /// Model the event is about
    pub fn model_name(&self) -> &str {
        &self.stats_data.model_name
    }
}

/// A statistic registered with the analyser and the rule it is swept with
#[derive(Clone)]
pub struct ModelScalingStatsWrapper {
    /// Keeper swept every period
    pub stats: Arc<dyn ModelScalingStats>,
    /// Comparison against `threshold`
    pub operator: LogicOperation,
    /// Threshold a model's value is compared to
    pub threshold: u32,
    /// Reset matched entries after each sweep
    pub reset: bool,
    /// Event emitted for each matched model
    pub event_type: ScaleDirection,
}

impl std::fmt::Debug for ModelScalingStatsWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelScalingStatsWrapper")
            .field("stats", &self.stats.key())
            .field("operator", &self.operator)
            .field("threshold", &self.threshold)
            .field("reset", &self.reset)
            .field("event_type", &self.event_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::LagKeeper;

    #[test]
    fn test_direction_display() {
        assert_eq!(ScaleDirection::Up.to_string(), "up");
        assert_eq!(ScaleDirection::Down.to_string(), "down");
    }

    #[test]
    fn test_event_serialization() {
        let event = ModelScalingEvent::new(
            ScaleDirection::Up,
            ModelStatsKV::new("iris", "lag", 31),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"up\""));
        let parsed: ModelScalingEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.model_name(), "iris");
    }

    #[test]
    fn test_wrapper_debug_names_stat() {
        let wrapper = ModelScalingStatsWrapper {
            stats: Arc::new(LagKeeper::lag()),
            operator: LogicOperation::Gte,
            threshold: 30,
            reset: true,
            event_type: ScaleDirection::Up,
        };
        let debug = format!("{:?}", wrapper);
        assert!(debug.contains("\"lag\""));
        assert!(debug.contains("threshold: 30"));
    }
}
