//! Lag statistic — in-flight request count for a model replica

use super::ModelStats;
use crate::error::Result;
use std::sync::atomic::{AtomicU32, Ordering};

/// Lock-free count of requests that entered but have not yet exited
#[derive(Debug, Default)]
pub struct LagStats {
    lag: AtomicU32,
}

impl LagStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn decrement(&self) {
        let mut current = self.lag.load(Ordering::Acquire);
        // Floor at zero: an unmatched exit never wraps the counter.
        while current > 0 {
            match self.lag.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl ModelStats for LagStats {
    fn enter(&self, _request_id: &str) -> Result<()> {
        self.lag.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn exit(&self, _request_id: &str) -> Result<()> {
        self.decrement();
        Ok(())
    }

    fn get(&self) -> u32 {
        self.lag.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.lag.store(0, Ordering::Release);
    }
}
