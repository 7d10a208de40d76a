//! Stats analyser — periodic threshold sweeps that emit scale events
//!
//! Every period the analyser asks each registered statistic which models cross
//! its threshold and pushes one [`ModelScalingEvent`] per match onto a bounded
//! channel. All sends in one round share a single deadline; when it passes,
//! the rest of the round is skipped and the loop waits for the next tick.
//!
//! Lifecycle is one-shot: `Created → Running → Stopped`. Stopping cancels a
//! token, so it is safe to call more than once, but a stopped analyser cannot
//! be started again.

use super::{ModelScalingEvent, ModelScalingStatsWrapper};
use crate::error::{Result, ScalingError};
use crate::lifecycle::{DependencyService, ServiceState};
use crate::observability::ScalingMetrics;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Capacity of the scaling event channel
pub const DEFAULT_EVENT_BUFFER: usize = 100;

/// Budget shared by all event sends in one sweep round
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Name reported through [`DependencyService::name`]
pub const SERVICE_NAME: &str = "stats-analyser";

/// Stats analyser runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AnalyserState {
    /// Constructed, background task not launched yet
    #[default]
    Created,
    /// Sweeping on every tick
    Running,
    /// Loop has exited
    Stopped,
}

impl std::fmt::Display for AnalyserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// One sweep round over every registered statistic
#[derive(Clone)]
struct Sweeper {
    wrappers: Arc<Vec<ModelScalingStatsWrapper>>,
    events_tx: mpsc::Sender<ModelScalingEvent>,
    send_timeout: Duration,
    metrics: Arc<ScalingMetrics>,
}

impl Sweeper {
    /// Sweep all statistics. Only a closed event channel or an out-of-range deadline is fatal.
    async fn process(&self) -> Result<()> {
        let deadline = Instant::now().checked_add(self.send_timeout).ok_or_else(|| {
            ScalingError::Lifecycle(format!("send timeout {:?} is out of range", self.send_timeout))
        })?;
        self.metrics.record_sweep();

        for wrapper in self.wrappers.iter() {
            match self.process_impl(wrapper, deadline).await {
                Ok(()) => {}
                Err(ScalingError::ChannelClosed) => return Err(ScalingError::ChannelClosed),
                Err(e) => {
                    tracing::warn!(
                        stat = wrapper.stats.key(),
                        error = %e,
                        "Skipping remaining statistics this round"
                    );
                    self.metrics.record_aborted_round();
                    break;
                }
            }
        }
        Ok(())
    }

    async fn process_impl(&self, wrapper: &ModelScalingStatsWrapper, deadline: Instant) -> Result<()> {
        let matched = wrapper
            .stats
            .get_all(wrapper.threshold, wrapper.operator, wrapper.reset)?;

        for kv in matched {
            tracing::debug!(
                model = kv.model_name,
                stat = kv.key,
                value = kv.value,
                direction = %wrapper.event_type,
                "Threshold crossed"
            );
            let stat = kv.key.clone();
            let event = ModelScalingEvent::new(wrapper.event_type, kv);

            match tokio::time::timeout_at(deadline, self.events_tx.send(event)).await {
                Ok(Ok(())) => self.metrics.record_event(&wrapper.event_type, &stat),
                Ok(Err(_)) => return Err(ScalingError::ChannelClosed),
                Err(_) => {
                    self.metrics.record_send_timeout();
                    return Err(ScalingError::EventTimeout);
                }
            }
        }
        Ok(())
    }

    /// `first_tick` is one full period after start, not immediately
    async fn run(
        self,
        first_tick: Instant,
        period: Duration,
        cancel: CancellationToken,
        state: Arc<RwLock<AnalyserState>>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        *state.write().unwrap() = AnalyserState::Running;
        tracing::info!(
            period_ms = period.as_millis() as u64,
            stats = self.wrappers.len(),
            "Stats analyser running"
        );

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                _ = ticker.tick() => {
                    if let Err(e) = self.process().await {
                        break Err(e);
                    }
                }
            }
        };

        *state.write().unwrap() = AnalyserState::Stopped;
        match &result {
            Ok(()) => tracing::info!("Stats analyser stopped"),
            Err(e) => tracing::error!(error = %e, "Stats analyser loop exited"),
        }
        result
    }
}

/// Background service that sweeps registered statistics every period
pub struct StatsAnalyserService {
    sweeper: Sweeper,
    period: Duration,
    events_rx: Mutex<Option<mpsc::Receiver<ModelScalingEvent>>>,
    state: Arc<RwLock<AnalyserState>>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl StatsAnalyserService {
    /// Create an analyser with the default channel capacity and send budget
    pub fn new(wrappers: Vec<ModelScalingStatsWrapper>, period: Duration) -> Self {
        Self::with_options(wrappers, period, DEFAULT_EVENT_BUFFER, DEFAULT_SEND_TIMEOUT)
    }

    /// Create an analyser with an explicit channel capacity and per-round send budget
    pub fn with_options(
        wrappers: Vec<ModelScalingStatsWrapper>,
        period: Duration,
        event_buffer: usize,
        send_timeout: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(event_buffer.max(1));
        Self {
            sweeper: Sweeper {
                wrappers: Arc::new(wrappers),
                events_tx,
                send_timeout,
                metrics: Arc::new(ScalingMetrics::new()),
            },
            period,
            events_rx: Mutex::new(Some(events_rx)),
            state: Arc::new(RwLock::new(AnalyserState::Created)),
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Take the receiving end of the event channel. Returns `None` once taken.
    pub fn take_events(&self) -> Option<mpsc::Receiver<ModelScalingEvent>> {
        self.events_rx.lock().unwrap().take()
    }

    /// Register a model with every statistic. Stops at the first failure.
    pub fn add_model(&self, model_name: &str) -> Result<()> {
        for wrapper in self.sweeper.wrappers.iter() {
            wrapper.stats.add(model_name)?;
        }
        tracing::debug!(model = model_name, "Model registered for scaling stats");
        Ok(())
    }

    /// Deregister a model from every statistic. Stops at the first failure.
    pub fn delete_model(&self, model_name: &str) -> Result<()> {
        for wrapper in self.sweeper.wrappers.iter() {
            wrapper.stats.delete(model_name)?;
        }
        tracing::debug!(model = model_name, "Model removed from scaling stats");
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> AnalyserState {
        *self.state.read().unwrap()
    }

    /// Registered statistics
    pub fn wrappers(&self) -> &[ModelScalingStatsWrapper] {
        &self.sweeper.wrappers
    }

    /// Counters recorded by the sweep loop
    pub fn metrics(&self) -> &Arc<ScalingMetrics> {
        &self.sweeper.metrics
    }

    /// Wait for the background loop to exit and return its result.
    ///
    /// Returns immediately if the analyser was never started or was already joined.
    pub async fn join(&self) -> Result<()> {
        let handle = self.handle.lock().unwrap().take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|e| ScalingError::Other(format!("stats analyser task failed: {}", e)))?,
            None => Ok(()),
        }
    }
}

impl DependencyService for StatsAnalyserService {
    fn set_state(&self, _state: ServiceState) {
        tracing::debug!(service = SERVICE_NAME, "Ignoring supervisor state");
    }

    fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock().unwrap();
        if self.cancel.is_cancelled() {
            return Err(ScalingError::Lifecycle(
                "stats analyser was stopped and cannot be restarted".into(),
            ));
        }
        if handle.is_some() {
            return Err(ScalingError::Lifecycle("stats analyser already started".into()));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ScalingError::Lifecycle(format!("stats analyser needs a tokio runtime: {}", e))
        })?;

        // `interval_at` panics on a zero period; deadlines must fit the clock
        if self.period.is_zero() {
            return Err(ScalingError::Lifecycle(
                "stats analyser period must be non-zero".into(),
            ));
        }
        let now = Instant::now();
        let first_tick = now.checked_add(self.period).ok_or_else(|| {
            ScalingError::Lifecycle(format!("stats analyser period {:?} is out of range", self.period))
        })?;
        if now.checked_add(self.sweeper.send_timeout).is_none() {
            return Err(ScalingError::Lifecycle(format!(
                "stats analyser send timeout {:?} is out of range",
                self.sweeper.send_timeout
            )));
        }

        let sweeper = self.sweeper.clone();
        let cancel = self.cancel.clone();
        let state = self.state.clone();
        let period = self.period;
        *handle = Some(runtime.spawn(sweeper.run(first_tick, period, cancel, state)));
        Ok(())
    }

    fn ready(&self) -> bool {
        self.state() == AnalyserState::Running
    }

    fn stop(&self) -> Result<()> {
        if !self.cancel.is_cancelled() {
            tracing::info!("Stopping stats analyser");
            self.cancel.cancel();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        SERVICE_NAME
    }
}

impl Drop for StatsAnalyserService {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
