//! Stats collector — request-path bookkeeping for scaling statistics
//!
//! Wraps a lag keeper and a last-used keeper behind the two calls made around
//! every inference request. Setup typically runs on its own task so it never
//! delays dispatch; the [`setup_latch`] pair guarantees that teardown's lag
//! decrement is never applied before setup's increment.

use crate::error::Result;
use crate::stats::{LagKeeper, LastUsedKeeper, ModelScalingStats};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Setup half of a [`setup_latch`]; signalled once lag has been incremented
#[derive(Debug)]
pub struct SetupDone(oneshot::Sender<()>);

impl SetupDone {
    fn done(self) {
        // The waiting side may already be gone
        let _ = self.0.send(());
    }
}

/// Teardown half of a [`setup_latch`]
#[derive(Debug)]
pub struct SetupWait(oneshot::Receiver<()>);

impl SetupWait {
    /// Wait until the paired setup has incremented lag.
    ///
    /// Also returns if the setup half is dropped without signalling.
    pub async fn wait(self) {
        let _ = self.0.await;
    }
}

/// Create the ordering latch shared by one request's setup and teardown
pub fn setup_latch() -> (SetupDone, SetupWait) {
    let (tx, rx) = oneshot::channel();
    (SetupDone(tx), SetupWait(rx))
}

/// Feeds lag and last-used statistics from the inference path
#[derive(Clone)]
pub struct StatsCollector {
    lag: Arc<LagKeeper>,
    last_used: Arc<LastUsedKeeper>,
}

impl StatsCollector {
    pub fn new(lag: Arc<LagKeeper>, last_used: Arc<LastUsedKeeper>) -> Self {
        Self { lag, last_used }
    }

    /// Lag keeper fed by this collector
    pub fn lag(&self) -> &Arc<LagKeeper> {
        &self.lag
    }

    /// Last-used keeper fed by this collector
    pub fn last_used(&self) -> &Arc<LastUsedKeeper> {
        &self.last_used
    }

    /// Record the start of a request: increment lag, signal `done`, then stamp last-used.
    ///
    /// `done` is signalled even when the lag increment fails; last-used is only
    /// stamped when it succeeds.
    pub fn scaling_metrics_setup(&self, done: SetupDone, model_name: &str) -> Result<()> {
        let lag_result = self.lag.model_infer_enter(model_name, "");
        done.done();
        lag_result?;
        self.last_used.add(model_name)
    }

    /// Record the end of a request once its setup has incremented lag
    pub async fn scaling_metrics_tear_down(&self, wait: SetupWait, model_name: &str) -> Result<()> {
        wait.wait().await;
        self.lag.model_infer_exit(model_name, "")
    }
}
