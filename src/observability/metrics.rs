//! Scaling metrics — lightweight counters for the stats analyser
//!
//! Provides in-process metrics tracking without external dependencies.
//! Metrics can be exported as JSON or rendered as Prometheus text format.

use crate::scaling::ScaleDirection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Metrics snapshot — a point-in-time view of all metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Sweep rounds run
    pub sweeps: u64,
    /// Scale-up events emitted
    pub scale_up_events: u64,
    /// Scale-down events emitted
    pub scale_down_events: u64,
    /// Event sends that hit the round deadline
    pub send_timeouts: u64,
    /// Rounds that skipped remaining statistics after an error
    pub aborted_rounds: u64,
    /// Events emitted per statistic key
    pub events_by_stat: HashMap<String, u64>,
}

impl MetricsSnapshot {
    /// Total events emitted in either direction
    pub fn events_emitted(&self) -> u64 {
        self.scale_up_events + self.scale_down_events
    }
}

/// Scaling metrics collector
pub struct ScalingMetrics {
    sweeps: AtomicU64,
    scale_up_events: AtomicU64,
    scale_down_events: AtomicU64,
    send_timeouts: AtomicU64,
    aborted_rounds: AtomicU64,
    events_by_stat: Arc<RwLock<HashMap<String, u64>>>,
}

impl ScalingMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            sweeps: AtomicU64::new(0),
            scale_up_events: AtomicU64::new(0),
            scale_down_events: AtomicU64::new(0),
            send_timeouts: AtomicU64::new(0),
            aborted_rounds: AtomicU64::new(0),
            events_by_stat: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Record a completed or aborted sweep round
    pub fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event handed to the event channel
    pub fn record_event(&self, direction: &ScaleDirection, stat: &str) {
        match direction {
            ScaleDirection::Up => self.scale_up_events.fetch_add(1, Ordering::Relaxed),
            ScaleDirection::Down => self.scale_down_events.fetch_add(1, Ordering::Relaxed),
        };
        let mut map = self.events_by_stat.write().unwrap();
        *map.entry(stat.to_string()).or_insert(0) += 1;
    }

    /// Record an event send that missed the round deadline
    pub fn record_send_timeout(&self) {
        self.send_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a round cut short by an error
    pub fn record_aborted_round(&self) {
        self.aborted_rounds.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total sweep rounds
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Get total events emitted
    pub fn events_emitted(&self) -> u64 {
        self.scale_up_events.load(Ordering::Relaxed) + self.scale_down_events.load(Ordering::Relaxed)
    }

    /// Take a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            scale_up_events: self.scale_up_events.load(Ordering::Relaxed),
            scale_down_events: self.scale_down_events.load(Ordering::Relaxed),
            send_timeouts: self.send_timeouts.load(Ordering::Relaxed),
            aborted_rounds: self.aborted_rounds.load(Ordering::Relaxed),
            events_by_stat: self.events_by_stat.read().unwrap().clone(),
        }
    }

    /// Render metrics in Prometheus text exposition format
    pub fn render_prometheus(&self) -> String {
        let snap = self.snapshot();
        let mut output = String::new();

        output.push_str("# HELP model_scaling_sweeps_total Stats analyser sweep rounds\n");
        output.push_str("# TYPE model_scaling_sweeps_total counter\n");
        output.push_str(&format!("model_scaling_sweeps_total {}\n", snap.sweeps));

        output.push_str("# HELP model_scaling_events_total Scaling events emitted by direction\n");
        output.push_str("# TYPE model_scaling_events_total counter\n");
        output.push_str(&format!(
            "model_scaling_events_total{{direction=\"up\"}} {}\n",
            snap.scale_up_events
        ));
        output.push_str(&format!(
            "model_scaling_events_total{{direction=\"down\"}} {}\n",
            snap.scale_down_events
        ));

        output.push_str(
            "# HELP model_scaling_send_timeouts_total Event sends that missed the round deadline\n",
        );
        output.push_str("# TYPE model_scaling_send_timeouts_total counter\n");
        output.push_str(&format!(
            "model_scaling_send_timeouts_total {}\n",
            snap.send_timeouts
        ));

        output.push_str("# HELP model_scaling_aborted_rounds_total Sweep rounds cut short\n");
        output.push_str("# TYPE model_scaling_aborted_rounds_total counter\n");
        output.push_str(&format!(
            "model_scaling_aborted_rounds_total {}\n",
            snap.aborted_rounds
        ));

        if !snap.events_by_stat.is_empty() {
            output.push_str(
                "# HELP model_scaling_stat_events_total Scaling events emitted per statistic\n",
            );
            output.push_str("# TYPE model_scaling_stat_events_total counter\n");
            for (stat, count) in &snap.events_by_stat {
                output.push_str(&format!(
                    "model_scaling_stat_events_total{{stat=\"{}\"}} {}\n",
                    stat, count
                ));
            }
        }

        output
    }
}

impl Default for ScalingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let m = ScalingMetrics::new();
        assert_eq!(m.sweeps(), 0);
        assert_eq!(m.events_emitted(), 0);
    }

    #[test]
    fn test_record_events_by_direction() {
        let m = ScalingMetrics::new();
        m.record_event(&ScaleDirection::Up, "lag");
        m.record_event(&ScaleDirection::Up, "lag");
        m.record_event(&ScaleDirection::Down, "last_used");

        let snap = m.snapshot();
        assert_eq!(snap.scale_up_events, 2);
        assert_eq!(snap.scale_down_events, 1);
        assert_eq!(snap.events_emitted(), 3);
        assert_eq!(snap.events_by_stat["lag"], 2);
        assert_eq!(snap.events_by_stat["last_used"], 1);
    }

    #[test]
    fn test_sweeps_and_timeouts() {
        let m = ScalingMetrics::new();
        m.record_sweep();
        m.record_sweep();
        m.record_send_timeout();
        m.record_aborted_round();
        let snap = m.snapshot();
        assert_eq!(snap.sweeps, 2);
        assert_eq!(snap.send_timeouts, 1);
        assert_eq!(snap.aborted_rounds, 1);
    }

    #[test]
    fn test_snapshot_serialization() {
        let m = ScalingMetrics::new();
        m.record_event(&ScaleDirection::Down, "last_used");
        let json = serde_json::to_string(&m.snapshot()).unwrap();
        let parsed: MetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scale_down_events, 1);
    }

    #[test]
    fn test_render_prometheus() {
        let m = ScalingMetrics::new();
        m.record_sweep();
        m.record_event(&ScaleDirection::Up, "lag");
        let out = m.render_prometheus();
        assert!(out.contains("model_scaling_sweeps_total 1"));
        assert!(out.contains("model_scaling_events_total{direction=\"up\"} 1"));
        assert!(out.contains("model_scaling_events_total{direction=\"down\"} 0"));
        assert!(out.contains("model_scaling_stat_events_total{stat=\"lag\"} 1"));
    }

    #[test]
    fn test_render_prometheus_omits_empty_stat_section() {
        let m = ScalingMetrics::new();
        assert!(!m.render_prometheus().contains("model_scaling_stat_events_total"));
    }
}
