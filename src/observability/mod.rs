//! Observability — scaling metrics
//!
//! Prometheus-compatible counters for the stats analyser. Logging goes
//! through `tracing` throughout the crate.

pub mod metrics;

pub use metrics::{MetricsSnapshot, ScalingMetrics};
