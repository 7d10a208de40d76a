//! Centralized error types for the scaling agent

use crate::stats::LogicOperation;
use thiserror::Error;

/// Scaling agent error types
#[derive(Debug, Error)]
pub enum ScalingError {
    /// No statistic is tracked for the model
    #[error("model replica not found: {0}")]
    ModelNotFound(String),

    /// Cache key is absent
    #[error("not found: {0}")]
    KeyNotFound(String),

    /// Cache key is already present
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Cache holds no entries
    #[error("empty")]
    Empty,

    /// Comparison operator not handled by this statistic
    #[error("operation not supported: {0}")]
    UnsupportedOperation(LogicOperation),

    /// `exit` called for a request that never entered
    #[error("start time not found for request {0}")]
    StartTimeNotFound(String),

    /// Sweep round ran out of its send budget
    #[error("timeout sending scaling event")]
    EventTimeout,

    /// Every event receiver has been dropped
    #[error("scaling event channel closed")]
    ChannelClosed,

    /// Invalid lifecycle transition
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ScalingError>;
