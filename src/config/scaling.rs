//! Scaling configuration — analyser period and per-statistic sweep rules

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ScalingError};
use crate::scaling::ScaleDirection;
use crate::stats::{LogicOperation, DELAY_KEY, LAG_KEY, LAST_USED_KEY};

/// Stats analyser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyserConfig {
    /// Seconds between threshold sweeps (default: 5)
    #[serde(default = "default_period")]
    pub period_secs: u64,

    /// Capacity of the scaling event channel (default: 100)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Milliseconds shared by all event sends in one sweep (default: 1000)
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

impl AnalyserConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period(),
            event_buffer: default_event_buffer(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

/// Sweep rule for one statistic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRuleConfig {
    /// Value a model is compared against
    pub threshold: u32,

    /// Comparison operator (default: "gte")
    #[serde(default)]
    pub operator: LogicOperation,

    /// Reset matched models after each sweep (default: false)
    #[serde(default)]
    pub reset: bool,

    /// Event emitted for matched models: "up" or "down"
    pub event: ScaleDirection,
}

/// Statistics the agent knows how to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsKind {
    /// In-flight request count
    Lag,
    /// Mean request latency in milliseconds
    Delay,
    /// Seconds since the model was last used
    LastUsed,
}

impl StatsKind {
    /// Key the statistic reports in sweep results
    pub fn key(&self) -> &'static str {
        match self {
            Self::Lag => LAG_KEY,
            Self::Delay => DELAY_KEY,
            Self::LastUsed => LAST_USED_KEY,
        }
    }
}

impl FromStr for StatsKind {
    type Err = ScalingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            LAG_KEY => Ok(Self::Lag),
            DELAY_KEY => Ok(Self::Delay),
            LAST_USED_KEY => Ok(Self::LastUsed),
            other => Err(ScalingError::Config(format!(
                "unknown statistic '{}' (expected lag, delay or last_used)",
                other
            ))),
        }
    }
}

fn default_period() -> u64 {
    5
}

fn default_event_buffer() -> usize {
    100
}

fn default_send_timeout() -> u64 {
    1000
}

/// Longest accepted sweep period (one day)
pub const MAX_PERIOD_SECS: u64 = 86_400;

/// Longest accepted per-round send budget (one hour)
pub const MAX_SEND_TIMEOUT_MS: u64 = 3_600_000;

/// Validate the analyser block
pub fn validate_analyser(analyser: &AnalyserConfig) -> Result<()> {
    if analyser.period_secs == 0 {
        return Err(ScalingError::Config(
            "analyser: period_secs must be greater than 0".into(),
        ));
    }
    if analyser.period_secs > MAX_PERIOD_SECS {
        return Err(ScalingError::Config(format!(
            "analyser: period_secs must be at most {}",
            MAX_PERIOD_SECS
        )));
    }
    if analyser.event_buffer == 0 {
        return Err(ScalingError::Config(
            "analyser: event_buffer must be greater than 0".into(),
        ));
    }
    if analyser.send_timeout_ms == 0 {
        return Err(ScalingError::Config(
            "analyser: send_timeout_ms must be greater than 0".into(),
        ));
    }
    if analyser.send_timeout_ms > MAX_SEND_TIMEOUT_MS {
        return Err(ScalingError::Config(format!(
            "analyser: send_timeout_ms must be at most {}",
            MAX_SEND_TIMEOUT_MS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyser_defaults() {
        let config = AnalyserConfig::default();
        assert_eq!(config.period(), Duration::from_secs(5));
        assert_eq!(config.event_buffer, 100);
        assert_eq!(config.send_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_stats_kind_from_str() {
        assert_eq!("lag".parse::<StatsKind>().unwrap(), StatsKind::Lag);
        assert_eq!("delay".parse::<StatsKind>().unwrap(), StatsKind::Delay);
        assert_eq!("last_used".parse::<StatsKind>().unwrap(), StatsKind::LastUsed);
        assert!("throughput".parse::<StatsKind>().is_err());
    }

    #[test]
    fn test_stats_kind_key_round_trips() {
        for kind in [StatsKind::Lag, StatsKind::Delay, StatsKind::LastUsed] {
            assert_eq!(kind.key().parse::<StatsKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_validate_analyser_rejects_zero_period() {
        let config = AnalyserConfig {
            period_secs: 0,
            ..AnalyserConfig::default()
        };
        let err = validate_analyser(&config).unwrap_err();
        assert!(err.to_string().contains("period_secs"));
    }

    #[test]
    fn test_validate_analyser_rejects_zero_buffer_and_timeout() {
        let config = AnalyserConfig {
            event_buffer: 0,
            ..AnalyserConfig::default()
        };
        assert!(validate_analyser(&config).is_err());

        let config = AnalyserConfig {
            send_timeout_ms: 0,
            ..AnalyserConfig::default()
        };
        assert!(validate_analyser(&config).is_err());
    }

    #[test]
    fn test_validate_analyser_rejects_huge_period_and_timeout() {
        let config = AnalyserConfig {
            period_secs: u64::MAX,
            ..AnalyserConfig::default()
        };
        let err = validate_analyser(&config).unwrap_err();
        assert!(err.to_string().contains("period_secs"));

        let config = AnalyserConfig {
            send_timeout_ms: u64::MAX,
            ..AnalyserConfig::default()
        };
        let err = validate_analyser(&config).unwrap_err();
        assert!(err.to_string().contains("send_timeout_ms"));
    }

    #[test]
    fn test_validate_analyser_accepts_limits() {
        let config = AnalyserConfig {
            period_secs: MAX_PERIOD_SECS,
            event_buffer: 1,
            send_timeout_ms: MAX_SEND_TIMEOUT_MS,
        };
        assert!(validate_analyser(&config).is_ok());
    }

    #[test]
    fn test_rule_serde_defaults() {
        let rule: StatsRuleConfig =
            serde_json::from_str(r#"{"threshold": 30, "event": "down"}"#).unwrap();
        assert_eq!(rule.threshold, 30);
        assert_eq!(rule.operator, LogicOperation::Gte);
        assert!(!rule.reset);
        assert_eq!(rule.event, ScaleDirection::Down);
    }
}
