//! Delay statistic — mean observed request latency for a model replica

use super::ModelStats;
use crate::error::{Result, ScalingError};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

#[derive(Debug, Default)]
struct DelayState {
    /// Requests that entered and have not exited yet
    start_times: HashMap<String, Instant>,
    /// Completed request durations in milliseconds
    delays: Vec<i64>,
}

/// Tracks request durations by request id and reports their mean.
///
/// Completed durations accumulate until [`ModelStats::reset`] is called; the
/// analyser resets this statistic on every matching sweep when configured
/// with `reset = true`.
#[derive(Debug, Default)]
pub struct DelayStats {
    state: RwLock<DelayState>,
}

impl DelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests currently in flight
    pub fn pending(&self) -> usize {
        self.state.read().unwrap().start_times.len()
    }
}

impl ModelStats for DelayStats {
    fn enter(&self, request_id: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state
            .start_times
            .insert(request_id.to_string(), Instant::now());
        Ok(())
    }

    fn exit(&self, request_id: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let started = state
            .start_times
            .remove(request_id)
            .ok_or_else(|| ScalingError::StartTimeNotFound(request_id.to_string()))?;
        state.delays.push(started.elapsed().as_millis() as i64);
        Ok(())
    }

    fn get(&self) -> u32 {
        let state = self.state.read().unwrap();
        if state.delays.is_empty() {
            return 0;
        }
        let total: i64 = state.delays.iter().sum();
        (total / state.delays.len() as i64).clamp(0, u32::MAX as i64) as u32
    }

    fn reset(&self) {
        let mut state = self.state.write().unwrap();
        state.delays.clear();
        state.start_times.clear();
    }
}
