//! Dependency service contract shared by background components

use crate::error::Result;
use std::any::Any;
use std::sync::Arc;

/// Opaque state handed to services by their supervisor
pub type ServiceState = Arc<dyn Any + Send + Sync>;

/// Lifecycle hooks a process supervisor drives for each background service
pub trait DependencyService: Send + Sync {
    /// Hand the service supervisor-owned state before `start`
    fn set_state(&self, state: ServiceState);

    /// Launch the service. Must not block the caller.
    fn start(&self) -> Result<()>;

    /// Whether the service is up and doing work
    fn ready(&self) -> bool;

    /// Signal the service to stop. Does not wait for it to finish.
    fn stop(&self) -> Result<()>;

    /// Service name (for logging)
    fn name(&self) -> &str;
}
