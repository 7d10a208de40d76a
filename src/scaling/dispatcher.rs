//! Event dispatcher — drains scale events into a sink
//!
//! Provides the `ScaleEventSink` async trait with two implementations:
//! - `LogSink` — logs every event (always compiled)
//! - `MockSink` — records events in memory (for tests)

use super::ModelScalingEvent;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Async consumer of scaling events, e.g. an autoscaler control loop
#[async_trait]
pub trait ScaleEventSink: Send + Sync {
    /// Act on a single event
    async fn handle(&self, event: &ModelScalingEvent) -> Result<()>;

    /// Sink name (for logging)
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// LogSink — logs events
// ---------------------------------------------------------------------------

/// Sink that logs every event and takes no action
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ScaleEventSink for LogSink {
    async fn handle(&self, event: &ModelScalingEvent) -> Result<()> {
        tracing::info!(
            model = event.stats_data.model_name,
            stat = event.stats_data.key,
            value = event.stats_data.value,
            direction = %event.event_type,
            "Scaling event"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Drain `events` into `sink` until `cancel` fires or every sender is gone.
///
/// Sink errors are logged and never stop the loop.
pub fn spawn_dispatcher(
    mut events: mpsc::Receiver<ModelScalingEvent>,
    sink: Arc<dyn ScaleEventSink>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(sink = sink.name(), "Scaling event dispatcher started");
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => {
                        tracing::debug!("Scaling event channel closed, exiting dispatcher");
                        break;
                    }
                },
            };

            if let Err(e) = sink.handle(&event).await {
                tracing::warn!(
                    sink = sink.name(),
                    model = event.model_name(),
                    error = %e,
                    "Scaling event sink failed"
                );
            }
        }
    })
}

// ---------------------------------------------------------------------------
// MockSink — records events for testing
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) struct MockSink {
    events: std::sync::Mutex<Vec<ModelScalingEvent>>,
    fail: bool,
}

#[cfg(test)]
impl MockSink {
    pub(crate) fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A sink that records and then fails every event
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub(crate) fn events(&self) -> Vec<ModelScalingEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ScaleEventSink for MockSink {
    async fn handle(&self, event: &ModelScalingEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(crate::error::ScalingError::Other("mock sink failure".into()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::ScaleDirection;
    use crate::stats::ModelStatsKV;
    use std::time::Duration;

    fn event(model: &str) -> ModelScalingEvent {
        ModelScalingEvent::new(ScaleDirection::Up, ModelStatsKV::new(model, "lag", 31))
    }

    #[tokio::test]
    async fn test_dispatches_in_order() {
        let (tx, rx) = mpsc::channel(10);
        let sink = Arc::new(MockSink::new());
        let handle = spawn_dispatcher(rx, sink.clone(), CancellationToken::new());

        tx.send(event("a")).await.unwrap();
        tx.send(event("b")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let models: Vec<_> = sink
            .events()
            .iter()
            .map(|e| e.model_name().to_string())
            .collect();
        assert_eq!(models, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_sink_errors_do_not_stop_loop() {
        let (tx, rx) = mpsc::channel(10);
        let sink = Arc::new(MockSink::failing());
        let handle = spawn_dispatcher(rx, sink.clone(), CancellationToken::new());

        tx.send(event("a")).await.unwrap();
        tx.send(event("b")).await.unwrap();
        drop(tx);
        handle.await.unwrap();
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_dispatcher() {
        let (_tx, rx) = mpsc::channel::<ModelScalingEvent>(10);
        let cancel = CancellationToken::new();
        let handle = spawn_dispatcher(rx, Arc::new(LogSink), cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_log_sink_accepts_events() {
        let sink = LogSink;
        assert!(sink.handle(&event("a")).await.is_ok());
        assert_eq!(sink.name(), "log");
    }
}
