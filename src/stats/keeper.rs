//! Stats keeper — one lazily created statistic per model
//!
//! Shared engine behind the lag and delay keepers. Lookups take the read lock
//! only; a write lock is taken the first time a model is seen.

use super::{DelayStats, LagStats, LogicOperation, ModelScalingStats, ModelStats, ModelStatsKV};
use super::{DELAY_KEY, LAG_KEY};
use crate::error::{Result, ScalingError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Keeper of in-flight request counts
pub type LagKeeper = ModelStatsKeeper<LagStats>;

/// Keeper of mean request latencies
pub type DelayKeeper = ModelStatsKeeper<DelayStats>;

/// Map of model name to a per-model statistic
pub struct ModelStatsKeeper<S> {
    /// Key reported by threshold sweeps
    key: String,
    /// Builds the statistic for a model seen for the first time
    factory: fn() -> S,
    stats: RwLock<HashMap<String, Arc<S>>>,
}

impl<S: ModelStats> ModelStatsKeeper<S> {
    /// Create a keeper that builds new entries with `factory`
    pub fn new(key: impl Into<String>, factory: fn() -> S) -> Self {
        Self {
            key: key.into(),
            factory,
            stats: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the model's statistic, creating it on first use
    fn get_or_create(&self, model_name: &str) -> Arc<S> {
        if let Some(stats) = self.stats.read().unwrap().get(model_name) {
            return stats.clone();
        }

        let mut map = self.stats.write().unwrap();
        // Another thread may have created it between the two locks
        map.entry(model_name.to_string())
            .or_insert_with(|| {
                tracing::debug!(model = model_name, stat = %self.key, "Tracking model");
                Arc::new((self.factory)())
            })
            .clone()
    }

    /// Record the start of an inference request for a model
    pub fn model_infer_enter(&self, model_name: &str, request_id: &str) -> Result<()> {
        self.get_or_create(model_name).enter(request_id)
    }

    /// Record the end of an inference request for a model
    pub fn model_infer_exit(&self, model_name: &str, request_id: &str) -> Result<()> {
        self.get_or_create(model_name).exit(request_id)
    }

    /// Names of all tracked models, in no particular order
    pub fn models(&self) -> Vec<String> {
        self.stats.read().unwrap().keys().cloned().collect()
    }

    /// Number of tracked models
    pub fn len(&self) -> usize {
        self.stats.read().unwrap().len()
    }

    /// Whether no model is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LagKeeper {
    /// Create a keeper of in-flight request counts
    pub fn lag() -> Self {
        Self::new(LAG_KEY, LagStats::new)
    }
}

impl DelayKeeper {
    /// Create a keeper of mean request latencies
    pub fn delay() -> Self {
        Self::new(DELAY_KEY, DelayStats::new)
    }
}

impl<S: ModelStats> ModelScalingStats for ModelStatsKeeper<S> {
    fn key(&self) -> &str {
        &self.key
    }

    fn add(&self, model_name: &str) -> Result<()> {
        self.get_or_create(model_name);
        Ok(())
    }

    fn delete(&self, model_name: &str) -> Result<()> {
        if self.stats.write().unwrap().remove(model_name).is_some() {
            tracing::debug!(model = model_name, stat = %self.key, "Stopped tracking model");
        }
        Ok(())
    }

    fn get(&self, model_name: &str) -> Result<u32> {
        self.stats
            .read()
            .unwrap()
            .get(model_name)
            .map(|stats| stats.get())
            .ok_or_else(|| ScalingError::ModelNotFound(model_name.to_string()))
    }

    fn get_all(
        &self,
        threshold: u32,
        operator: LogicOperation,
        reset: bool,
    ) -> Result<Vec<ModelStatsKV>> {
        if operator != LogicOperation::Gte {
            return Err(ScalingError::UnsupportedOperation(operator));
        }

        let map = self.stats.read().unwrap();
        let mut matched = Vec::new();
        for (model_name, stats) in map.iter() {
            let value = stats.get();
            if value >= threshold {
                matched.push(ModelStatsKV::new(model_name.as_str(), self.key.as_str(), value));
                if reset {
                    stats.reset();
                }
            }
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keeper_with_lags(lags: &[(&str, u32)]) -> LagKeeper {
        let keeper = LagKeeper::lag();
        for (model, lag) in lags {
            keeper.add(model).unwrap();
            for i in 0..*lag {
                keeper.model_infer_enter(model, &i.to_string()).unwrap();
            }
        }
        keeper
    }

    fn sorted(mut kvs: Vec<ModelStatsKV>) -> Vec<(String, u32)> {
        kvs.sort_by(|a, b| a.model_name.cmp(&b.model_name));
        kvs.into_iter().map(|kv| (kv.model_name, kv.value)).collect()
    }

    // --- enter / exit ---

    #[test]
    fn test_enter_creates_lazily() {
        let keeper = LagKeeper::lag();
        assert!(keeper.is_empty());
        keeper.model_infer_enter("iris", "r1").unwrap();
        assert_eq!(keeper.len(), 1);
        assert_eq!(keeper.get("iris").unwrap(), 1);
    }

    #[test]
    fn test_exit_decrements() {
        let keeper = keeper_with_lags(&[("iris", 2)]);
        keeper.model_infer_exit("iris", "0").unwrap();
        assert_eq!(keeper.get("iris").unwrap(), 1);
    }

    #[test]
    fn test_exit_unknown_model_creates_at_zero() {
        let keeper = LagKeeper::lag();
        keeper.model_infer_exit("iris", "r1").unwrap();
        assert_eq!(keeper.get("iris").unwrap(), 0);
    }

    #[test]
    fn test_delay_keeper_exit_without_enter_fails() {
        let keeper = DelayKeeper::delay();
        let err = keeper.model_infer_exit("iris", "r1").unwrap_err();
        assert!(matches!(err, ScalingError::StartTimeNotFound(_)));
    }

    // --- add / delete / get ---

    #[test]
    fn test_add_registers_zero() {
        let keeper = LagKeeper::lag();
        keeper.add("iris").unwrap();
        assert_eq!(keeper.get("iris").unwrap(), 0);
        // Adding again keeps existing state
        keeper.model_infer_enter("iris", "r1").unwrap();
        keeper.add("iris").unwrap();
        assert_eq!(keeper.get("iris").unwrap(), 1);
    }

    #[test]
    fn test_get_missing_model() {
        let keeper = LagKeeper::lag();
        let err = keeper.get("ghost").unwrap_err();
        assert!(matches!(err, ScalingError::ModelNotFound(m) if m == "ghost"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let keeper = keeper_with_lags(&[("iris", 1)]);
        keeper.delete("iris").unwrap();
        assert!(keeper.get("iris").is_err());
        keeper.delete("iris").unwrap();
        keeper.delete("never-added").unwrap();
    }

    #[test]
    fn test_models_lists_all() {
        let keeper = keeper_with_lags(&[("a", 0), ("b", 1)]);
        let mut models = keeper.models();
        models.sort();
        assert_eq!(models, vec!["a".to_string(), "b".to_string()]);
    }

    // --- get_all ---

    #[test]
    fn test_get_all_threshold_without_reset() {
        let keeper = keeper_with_lags(&[("m1", 1), ("m2", 2), ("m3", 3)]);
        let matched = keeper.get_all(2, LogicOperation::Gte, false).unwrap();
        assert_eq!(
            sorted(matched),
            vec![("m2".to_string(), 2), ("m3".to_string(), 3)]
        );
        assert_eq!(keeper.get("m1").unwrap(), 1);
        assert_eq!(keeper.get("m2").unwrap(), 2);
        assert_eq!(keeper.get("m3").unwrap(), 3);
    }

    #[test]
    fn test_get_all_threshold_with_reset() {
        let keeper = keeper_with_lags(&[("m1", 1), ("m2", 2), ("m3", 3)]);
        let matched = keeper.get_all(2, LogicOperation::Gte, true).unwrap();
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|kv| kv.key == LAG_KEY));
        assert_eq!(keeper.get("m1").unwrap(), 1);
        assert_eq!(keeper.get("m2").unwrap(), 0);
        assert_eq!(keeper.get("m3").unwrap(), 0);
    }

    #[test]
    fn test_get_all_zero_threshold_matches_everything() {
        let keeper = keeper_with_lags(&[("m1", 0), ("m2", 5)]);
        let matched = keeper.get_all(0, LogicOperation::Gte, false).unwrap();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_get_all_empty_keeper() {
        let keeper = LagKeeper::lag();
        assert!(keeper.get_all(1, LogicOperation::Gte, true).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_enter_on_new_model() {
        let keeper = std::sync::Arc::new(LagKeeper::lag());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let keeper = keeper.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        keeper
                            .model_infer_enter("shared", &format!("{}-{}", t, i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(keeper.len(), 1);
        assert_eq!(keeper.get("shared").unwrap(), 800);
    }
}
