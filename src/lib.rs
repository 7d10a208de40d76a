//! # Inference Scaling
//!
//! Per-model scaling statistics for a model-serving node. Request-path hooks
//! feed cheap counters; a periodic analyser sweeps them and emits scale-up and
//! scale-down events for an autoscaler to act on.
//!
//! ## Architecture
//!
//! ```text
//! Request → StatsCollector → Keepers (lag, delay, last_used)
//!                                  ↓
//!                  StatsAnalyserService (periodic sweep)
//!                                  ↓
//!                  ModelScalingEvent → ScaleEventSink
//! ```
//!
//! ## Core Features
//!
//! - **Lag**: in-flight request count per model, floored at zero
//! - **Delay**: mean request latency per model
//! - **Last used**: least-recently-used ordering backed by an indexed min-heap
//! - **Sweeps**: threshold rules per statistic with optional reset after report
//! - **Backpressure**: one send deadline per sweep round over a bounded channel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use inference_scaling::{config::AgentConfig, scaling::LogSink, ScalingAgent};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> inference_scaling::Result<()> {
//!     let config = AgentConfig::from_file("agent.hcl").await?;
//!     let agent = ScalingAgent::new(config)?;
//!     agent.start(Arc::new(LogSink))?;
//!     agent.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod scaling;
pub mod stats;

// Re-export main types
pub use agent::ScalingAgent;
pub use error::{Result, ScalingError};
pub use lifecycle::DependencyService;
pub use scaling::{ModelScalingEvent, ScaleDirection, StatsAnalyserService, StatsCollector};

use serde::{Deserialize, Serialize};

/// Scaling agent runtime state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AgentState {
    /// Agent has been created but not yet started
    #[default]
    Created,
    /// Agent is spawning the analyser and dispatcher
    Starting,
    /// Analyser is sweeping and events are being dispatched
    Running,
    /// Agent is stopping background tasks
    Stopping,
    /// Agent has fully stopped
    Stopped,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Agent health status snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Current agent state
    pub state: AgentState,
    /// Whether the analyser loop is running
    pub analyser_ready: bool,
    /// Uptime in seconds since the agent was created
    pub uptime_secs: u64,
    /// Number of models with scaling statistics
    pub tracked_models: usize,
    /// Sweep rounds completed
    pub sweeps: u64,
    /// Scaling events emitted since start
    pub events_emitted: u64,
}
