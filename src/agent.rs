//! Scaling agent — wires configuration, keepers, analyser and dispatcher
//!
//! Builds one keeper per statistic, registers the configured sweep rules with
//! the stats analyser, and forwards scaling events to a sink.

use crate::config::{AgentConfig, StatsKind};
use crate::error::{Result, ScalingError};
use crate::lifecycle::DependencyService;
use crate::observability::ScalingMetrics;
use crate::scaling::{
    spawn_dispatcher, ModelScalingStatsWrapper, ScaleEventSink, StatsAnalyserService,
    StatsCollector,
};
use crate::stats::{DelayKeeper, LagKeeper, LastUsedKeeper, ModelScalingStats};
use crate::{AgentState, HealthStatus};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// The scaling agent — coordinates all scaling components on one node
pub struct ScalingAgent {
    /// Configuration the agent was built from
    config: AgentConfig,
    /// Agent runtime state
    state: Arc<RwLock<AgentState>>,
    /// Start time
    start_time: Instant,
    /// Shutdown flag
    shutdown: AtomicBool,
    lag: Arc<LagKeeper>,
    delay: Arc<DelayKeeper>,
    last_used: Arc<LastUsedKeeper>,
    collector: StatsCollector,
    analyser: StatsAnalyserService,
    /// Stops the event dispatcher
    cancel: CancellationToken,
    dispatcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ScalingAgent {
    /// Create a new agent from configuration
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;

        let lag = Arc::new(LagKeeper::lag());
        let delay = Arc::new(DelayKeeper::delay());
        let last_used = Arc::new(LastUsedKeeper::new());

        let mut wrappers = Vec::new();
        for (kind, rule) in config.rules()? {
            let stats: Arc<dyn ModelScalingStats> = match kind {
                StatsKind::Lag => lag.clone(),
                StatsKind::Delay => delay.clone(),
                StatsKind::LastUsed => last_used.clone(),
            };
            wrappers.push(ModelScalingStatsWrapper {
                stats,
                operator: rule.operator,
                threshold: rule.threshold,
                reset: rule.reset,
                event_type: rule.event,
            });
        }
        tracing::info!(rules = wrappers.len(), "Scaling rules registered");

        let analyser = StatsAnalyserService::with_options(
            wrappers,
            config.analyser.period(),
            config.analyser.event_buffer,
            config.analyser.send_timeout(),
        );

        Ok(Self {
            collector: StatsCollector::new(lag.clone(), last_used.clone()),
            config,
            state: Arc::new(RwLock::new(AgentState::Created)),
            start_time: Instant::now(),
            shutdown: AtomicBool::new(false),
            lag,
            delay,
            last_used,
            analyser,
            cancel: CancellationToken::new(),
            dispatcher: Mutex::new(None),
        })
    }

    /// Start the analyser and forward its events to `sink`
    pub fn start(&self, sink: Arc<dyn ScaleEventSink>) -> Result<()> {
        tokio::runtime::Handle::try_current().map_err(|e| {
            ScalingError::Lifecycle(format!("scaling agent needs a tokio runtime: {}", e))
        })?;

        let events = self
            .analyser
            .take_events()
            .ok_or_else(|| ScalingError::Lifecycle("scaling agent already started".into()))?;
        self.set_state(AgentState::Starting);

        let handle = spawn_dispatcher(events, sink.clone(), self.cancel.clone());
        *self.dispatcher.lock().unwrap() = Some(handle);
        tracing::info!(sink = sink.name(), "Scaling event dispatcher started");

        if let Err(e) = self.analyser.start() {
            tracing::error!(error = %e, "Failed to start stats analyser");
            self.cancel.cancel();
            self.set_state(AgentState::Stopped);
            return Err(e);
        }

        self.set_state(AgentState::Running);
        tracing::info!("Scaling agent is running");
        Ok(())
    }

    /// Initiate graceful shutdown and wait for background tasks to exit
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return; // Already shutting down
        }

        self.set_state(AgentState::Stopping);
        tracing::info!("Scaling agent shutting down");

        if let Err(e) = self.analyser.stop() {
            tracing::warn!(error = %e, "Failed to stop stats analyser");
        }
        if let Err(e) = self.analyser.join().await {
            tracing::warn!(error = %e, "Stats analyser exited with error");
        }

        self.cancel.cancel();
        let handle = self.dispatcher.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        self.set_state(AgentState::Stopped);
        tracing::info!("Scaling agent stopped");
    }

    /// Wait for a shutdown signal (Ctrl+C)
    pub async fn wait_for_shutdown(&self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        self.shutdown().await;
    }

    /// Register a newly deployed model with every statistic
    pub fn deploy_model(&self, model_name: &str) -> Result<()> {
        self.analyser.add_model(model_name)
    }

    /// Remove an undeployed model from every statistic
    pub fn undeploy_model(&self, model_name: &str) -> Result<()> {
        self.analyser.delete_model(model_name)
    }

    /// Request-path collector feeding lag and last-used
    pub fn collector(&self) -> &StatsCollector {
        &self.collector
    }

    /// Lag keeper
    pub fn lag(&self) -> &Arc<LagKeeper> {
        &self.lag
    }

    /// Delay keeper; fed by callers that track per-request latency
    pub fn delay(&self) -> &Arc<DelayKeeper> {
        &self.delay
    }

    /// Last-used keeper
    pub fn last_used(&self) -> &Arc<LastUsedKeeper> {
        &self.last_used
    }

    /// The stats analyser
    pub fn analyser(&self) -> &StatsAnalyserService {
        &self.analyser
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> &Arc<ScalingMetrics> {
        self.analyser.metrics()
    }

    /// Get the configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Get the current agent state
    pub fn state(&self) -> AgentState {
        self.state.read().unwrap().clone()
    }

    /// Get a health status snapshot
    pub fn health(&self) -> HealthStatus {
        let snapshot = self.metrics().snapshot();
        HealthStatus {
            state: self.state(),
            analyser_ready: self.analyser.ready(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            tracked_models: self.tracked_models(),
            sweeps: snapshot.sweeps,
            events_emitted: snapshot.events_emitted(),
        }
    }

    /// Distinct models known to any keeper
    fn tracked_models(&self) -> usize {
        let mut models: HashSet<String> = self.lag.models().into_iter().collect();
        models.extend(self.delay.models());
        models.extend(self.last_used.models());
        models.len()
    }

    /// Check if the agent is running
    pub fn is_running(&self) -> bool {
        self.state() == AgentState::Running
    }

    fn set_state(&self, new_state: AgentState) {
        let mut state = self.state.write().unwrap();
        tracing::debug!(from = %*state, to = %new_state, "State transition");
        *state = new_state;
    }
}
