//! Last-used keeper — recency of inference traffic per model
//!
//! Backed by the min-priority [`LruCacheManager`]. The priority of a model is
//! its last-used Unix timestamp in seconds, so the least recently used model
//! is the minimum and surfaces first from `peek`/`evict`.

use super::{unix_now, LogicOperation, ModelScalingStats, ModelStatsKV, LAST_USED_KEY};
use crate::cache::{CacheManager, LruCacheManager};
use crate::error::{Result, ScalingError};

/// Tracks when each model last received traffic
#[derive(Debug, Default)]
pub struct LastUsedKeeper {
    cache: LruCacheManager,
}

impl LastUsedKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a model with an explicit last-used time (Unix seconds).
    ///
    /// Updates first and falls back to an insert for an unseen model. If a
    /// concurrent call inserts the same model in between, the fallback fails
    /// with `AlreadyExists`; the model is stamped recently either way.
    pub fn set(&self, model_name: &str, unix_secs: u32) -> Result<()> {
        let priority = unix_secs as i64;
        match self.cache.update(model_name, priority) {
            Ok(()) => Ok(()),
            Err(ScalingError::KeyNotFound(_)) => self.cache.add(model_name, priority),
            Err(e) => Err(e),
        }
    }

    /// Names of all tracked models, in no particular order
    pub fn models(&self) -> Vec<String> {
        self.cache.get_items().0
    }

    /// Number of tracked models
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no model is tracked
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl ModelScalingStats for LastUsedKeeper {
    fn key(&self) -> &str {
        LAST_USED_KEY
    }

    /// Stamp the model as used now
    fn add(&self, model_name: &str) -> Result<()> {
        self.set(model_name, unix_now().clamp(0, u32::MAX as i64) as u32)
    }

    fn delete(&self, model_name: &str) -> Result<()> {
        self.cache.delete(model_name)
    }

    fn get(&self, model_name: &str) -> Result<u32> {
        let priority = self.cache.get(model_name).map_err(|e| match e {
            ScalingError::KeyNotFound(_) => ScalingError::ModelNotFound(model_name.to_string()),
            other => other,
        })?;
        Ok(priority.clamp(0, u32::MAX as i64) as u32)
    }

    /// Models idle for at least `threshold` seconds.
    ///
    /// Drains the heap from the oldest entry and stops at the first model used
    /// after the cutoff; heap order guarantees nothing later qualifies. Cold
    /// models are re-inserted unless `reset` is set. A model touched between
    /// its eviction and re-insertion may be reported stale once.
    fn get_all(
        &self,
        threshold: u32,
        operator: LogicOperation,
        reset: bool,
    ) -> Result<Vec<ModelStatsKV>> {
        if operator != LogicOperation::Gte {
            return Err(ScalingError::UnsupportedOperation(operator));
        }

        let cutoff = unix_now() - threshold as i64;
        let mut cold = Vec::new();

        loop {
            let (model_name, last_used) = match self.cache.evict() {
                Ok(entry) => entry,
                Err(ScalingError::Empty) => break,
                Err(e) => return Err(e),
            };
            if last_used > cutoff {
                if let Err(e) = self.cache.add(&model_name, last_used) {
                    // Touched concurrently; the newer stamp wins
                    tracing::debug!(model = model_name, error = %e, "Skipped re-insert");
                }
                break;
            }
            cold.push((model_name, last_used));
        }

        let mut matched = Vec::with_capacity(cold.len());
        for (model_name, last_used) in cold {
            if !reset {
                if let Err(e) = self.cache.add(&model_name, last_used) {
                    tracing::debug!(model = model_name, error = %e, "Skipped re-insert");
                }
            }
            let value = last_used.clamp(0, u32::MAX as i64) as u32;
            matched.push(ModelStatsKV::new(model_name, LAST_USED_KEY, value));
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn now() -> u32 {
        unix_now() as u32
    }

    #[test]
    fn test_add_stamps_now() {
        let keeper = LastUsedKeeper::new();
        let before = now();
        keeper.add("iris").unwrap();
        let stamped = keeper.get("iris").unwrap();
        assert!(stamped >= before && stamped <= now());
    }

    #[test]
    fn test_add_twice_updates() {
        let keeper = LastUsedKeeper::new();
        keeper.set("iris", 100).unwrap();
        keeper.add("iris").unwrap();
        assert!(keeper.get("iris").unwrap() > 100);
        assert_eq!(keeper.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let keeper = LastUsedKeeper::new();
        assert!(matches!(
            keeper.get("ghost"),
            Err(ScalingError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let keeper = LastUsedKeeper::new();
        keeper.add("iris").unwrap();
        keeper.delete("iris").unwrap();
        assert!(keeper.get("iris").is_err());
        // Unlike the stats keeper, deleting an absent model is an error
        assert!(keeper.delete("iris").is_err());
    }

    // --- get_all ---

    #[test]
    fn test_get_all_reports_only_cold_models() {
        let keeper = LastUsedKeeper::new();
        let t = now();
        keeper.set("cold", t - 100).unwrap();
        keeper.set("cool", t - 31).unwrap();
        keeper.add("hot").unwrap();

        let mut matched = keeper.get_all(30, LogicOperation::Gte, false).unwrap();
        matched.sort_by_key(|kv| kv.value);
        let names: Vec<_> = matched.iter().map(|kv| kv.model_name.as_str()).collect();
        assert_eq!(names, vec!["cold", "cool"]);
        assert_eq!(matched[0].value, t - 100);
        assert!(matched.iter().all(|kv| kv.key == LAST_USED_KEY));
    }

    #[test]
    fn test_get_all_without_reset_keeps_models() {
        let keeper = LastUsedKeeper::new();
        let t = now();
        keeper.set("cold", t - 100).unwrap();
        keeper.add("hot").unwrap();

        assert_eq!(keeper.get_all(30, LogicOperation::Gte, false).unwrap().len(), 1);
        assert_eq!(keeper.len(), 2);
        // A repeated sweep detects the same model again
        assert_eq!(keeper.get_all(30, LogicOperation::Gte, false).unwrap().len(), 1);
        assert_eq!(keeper.get("cold").unwrap(), t - 100);
    }

    #[test]
    fn test_get_all_with_reset_evicts_models() {
        let keeper = LastUsedKeeper::new();
        let t = now();
        keeper.set("cold", t - 100).unwrap();
        keeper.add("hot").unwrap();

        assert_eq!(keeper.get_all(30, LogicOperation::Gte, true).unwrap().len(), 1);
        assert!(keeper.get("cold").is_err());
        assert!(keeper.get("hot").is_ok());
        assert!(keeper.get_all(30, LogicOperation::Gte, true).unwrap().is_empty());
    }

    #[test]
    fn test_get_all_nothing_cold() {
        let keeper = LastUsedKeeper::new();
        keeper.add("a").unwrap();
        keeper.add("b").unwrap();
        assert!(keeper.get_all(30, LogicOperation::Gte, false).unwrap().is_empty());
        assert_eq!(keeper.len(), 2);
    }

    #[test]
    fn test_get_all_empty() {
        let keeper = LastUsedKeeper::new();
        assert!(keeper.get_all(0, LogicOperation::Gte, true).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_touches() {
        let keeper = Arc::new(LastUsedKeeper::new());
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let keeper = keeper.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis((i * 7 % 13) as u64));
                    // Each model is touched by two threads, so inserts race
                    for model in [format!("model-{}", i), format!("model-{}", (i + 1) % 100)] {
                        match keeper.add(&model) {
                            Ok(()) | Err(ScalingError::AlreadyExists(_)) => {}
                            Err(e) => panic!("unexpected error touching {}: {}", model, e),
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let t = now();
        for i in 0..100 {
            assert!(keeper.get(&format!("model-{}", i)).unwrap() <= t);
        }
        let matched = keeper.get_all(0, LogicOperation::Gte, false).unwrap();
        assert_eq!(matched.len(), 100);
        assert_eq!(keeper.len(), 100);
        assert_eq!(keeper.models().len(), 100);
    }
}
