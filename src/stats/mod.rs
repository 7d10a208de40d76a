//! Scaling statistics — per-model counters and the keepers that track them
//!
//! A [`ModelStats`] is a single statistic for one model replica (in-flight lag,
//! request delay). A [`ModelScalingStats`] keeper holds one statistic per model
//! and answers threshold sweeps for the analyser.
//!
//! ```text
//!  request enter/exit ──► ModelStatsKeeper<LagStats>   ──┐
//!                         ModelStatsKeeper<DelayStats> ──┼──► get_all(threshold, op, reset)
//!  request touch ───────► LastUsedKeeper               ──┘
//! ```

pub mod delay;
pub mod keeper;
pub mod lag;
pub mod last_used;

pub use delay::DelayStats;
pub use keeper::{DelayKeeper, LagKeeper, ModelStatsKeeper};
pub use lag::LagStats;
pub use last_used::LastUsedKeeper;

use crate::error::{Result, ScalingError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Statistic key reported for in-flight request counts
pub const LAG_KEY: &str = "lag";
/// Statistic key reported for average request latency
pub const DELAY_KEY: &str = "delay";
/// Statistic key reported for last-used timestamps
pub const LAST_USED_KEY: &str = "last_used";

/// Comparison applied between a statistic and a sweep threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LogicOperation {
    /// Statistic is greater than or equal to the threshold
    #[default]
    Gte,
}

impl std::fmt::Display for LogicOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gte => write!(f, "gte"),
        }
    }
}

impl FromStr for LogicOperation {
    type Err = ScalingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gte" | ">=" => Ok(Self::Gte),
            other => Err(ScalingError::Config(format!(
                "unknown logic operation '{}'",
                other
            ))),
        }
    }
}

/// A single statistic for one model replica
pub trait ModelStats: Send + Sync {
    /// A request for the model has started
    fn enter(&self, request_id: &str) -> Result<()>;

    /// A request for the model has finished
    fn exit(&self, request_id: &str) -> Result<()>;

    /// Current value of the statistic
    fn get(&self) -> u32;

    /// Clear the statistic back to its initial state
    fn reset(&self);
}

/// A keeper of one statistic across all models, swept by the analyser
pub trait ModelScalingStats: Send + Sync {
    /// Key reported in [`ModelStatsKV::key`] for this statistic
    fn key(&self) -> &str;

    /// Register a model (or touch it, for recency-based keepers)
    fn add(&self, model_name: &str) -> Result<()>;

    /// Stop tracking a model
    fn delete(&self, model_name: &str) -> Result<()>;

    /// Current value for a model
    fn get(&self, model_name: &str) -> Result<u32>;

    /// Return every model whose statistic satisfies `operator` against
    /// `threshold`, resetting matched entries when `reset` is set.
    fn get_all(
        &self,
        threshold: u32,
        operator: LogicOperation,
        reset: bool,
    ) -> Result<Vec<ModelStatsKV>>;
}

/// One model's value for one statistic, as returned by a threshold sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatsKV {
    /// Model the value belongs to
    pub model_name: String,
    /// Statistic that produced the value (e.g. "lag", "last_used")
    pub key: String,
    /// Statistic value at sweep time
    pub value: u32,
}

impl ModelStatsKV {
    pub fn new(model_name: impl Into<String>, key: impl Into<String>, value: u32) -> Self {
        Self {
            model_name: model_name.into(),
            key: key.into(),
            value,
        }
    }
}

/// Seconds since the Unix epoch
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
