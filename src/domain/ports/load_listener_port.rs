//! Port definition for load lifecycle notifications.

/// Payload of the start-load notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartLoad {
    /// True if the resource had already completed loading in this process.
    pub was_cached: bool,
}

/// External collaborator notified as the main image loads.
#[cfg_attr(test, mockall::automock)]
pub trait LoadListener: Send + Sync {
    /// Called when fetching of the main image begins.
    fn on_start_load(&self, event: StartLoad);

    /// Called exactly once per resource when the main image is ready.
    fn on_load(&self);
}

/// Listener that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl LoadListener for NoopListener {
    fn on_start_load(&self, _event: StartLoad) {}

    fn on_load(&self) {}
}
