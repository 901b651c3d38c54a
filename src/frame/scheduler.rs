use crate::errors::DisplayError;
use std::time::Duration;
use tokio::runtime::Handle;

/// A unit of work posted to a [`Scheduler`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after a delay. On a UI platform this is the UI thread's message loop.
pub trait Scheduler: Send + Sync {
    fn post_delayed(&self, delay: Duration, task: Task);
}

/// Scheduler backed by a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running on.
    pub fn current() -> Result<Self, DisplayError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| DisplayError::InvalidState(format!("no tokio runtime available: {}", e)))
    }
}

impl Scheduler for TokioScheduler {
    fn post_delayed(&self, delay: Duration, task: Task) {
        // The deadline is fixed at post time, not when the spawned task first runs.
        let deadline = tokio::time::Instant::now() + delay;
        self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            task();
        });
    }
}
