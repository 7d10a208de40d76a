//! Configuration types for the scaling agent
//!
//! Defines the analyser settings and the sweep rule for each statistic.
//! Uses HCL (HashiCorp Configuration Language) as the configuration format.

pub mod scaling;

pub use scaling::{AnalyserConfig, StatsKind, StatsRuleConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Result, ScalingError};
use crate::scaling::ScaleDirection;
use crate::stats::LogicOperation;

/// Top-level agent configuration
///
/// # HCL Example
///
/// ```hcl
/// analyser {
///   period_secs = 5
/// }
///
/// stats "lag" {
///   threshold = 30
///   reset     = true
///   event     = "up"
/// }
///
/// stats "last_used" {
///   threshold = 30
///   event     = "down"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Stats analyser settings
    #[serde(default)]
    pub analyser: AnalyserConfig,

    /// Sweep rules keyed by statistic: "lag", "delay" or "last_used"
    #[serde(default)]
    pub stats: BTreeMap<String, StatsRuleConfig>,
}

impl AgentConfig {
    /// Load configuration from an HCL file.
    ///
    /// The file must contain valid HCL content regardless of extension.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ScalingError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_hcl(&content)
    }

    /// Parse configuration from an HCL string
    pub fn from_hcl(content: &str) -> Result<Self> {
        hcl::from_str(content)
            .map_err(|e| ScalingError::Config(format!("Failed to parse HCL config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        scaling::validate_analyser(&self.analyser)?;
        for name in self.stats.keys() {
            name.parse::<StatsKind>()?;
        }
        Ok(())
    }

    /// Sweep rules with their parsed statistic kind, in key order
    pub fn rules(&self) -> Result<Vec<(StatsKind, &StatsRuleConfig)>> {
        self.stats
            .iter()
            .map(|(name, rule)| Ok((name.parse::<StatsKind>()?, rule)))
            .collect()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        let mut stats = BTreeMap::new();
        stats.insert(
            StatsKind::Lag.key().to_string(),
            StatsRuleConfig {
                threshold: 30,
                operator: LogicOperation::Gte,
                reset: true,
                event: ScaleDirection::Up,
            },
        );
        stats.insert(
            StatsKind::LastUsed.key().to_string(),
            StatsRuleConfig {
                threshold: 30,
                operator: LogicOperation::Gte,
                reset: false,
                event: ScaleDirection::Down,
            },
        );

        Self {
            analyser: AnalyserConfig::default(),
            stats,
        }
    }
}
