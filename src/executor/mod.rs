//! Background task execution for topology refreshes
//!
//! The registry owns exactly one [`TaskExecutor`]; every replica set monitor
//! schedules its recurring refresh onto it. The executor is internally
//! thread-safe, so work may be scheduled concurrently from any thread.
mod thread_pool;
pub use thread_pool::*;


use std::ops::ControlFlow;
use std::time::Duration;

use futures::future::BoxFuture;
#[cfg(test)]
use mockall::automock;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// One round of a recurring task. Returning `ControlFlow::Break` ends the recurrence.
pub type RecurringTask = Box<dyn FnMut() -> BoxFuture<'static, ControlFlow<()>> + Send + 'static>;

/// Scheduling primitive consumed by the monitor registry
#[cfg_attr(test, automock)]
pub trait TaskExecutor: Send + Sync + 'static {
    /// Starts the worker pool. Must be called before any work is scheduled.
    fn startup(&self) -> Result<()>;

    /// Signals every scheduled task to stop. Does not wait.
    fn shutdown(&self);

    /// Blocks until all outstanding work has quiesced.
    ///
    /// Implies [`shutdown`](TaskExecutor::shutdown).
    fn join(&self);

    fn is_shutdown(&self) -> bool;

    /// Runs `task` once on the worker pool.
    fn schedule(
        &self,
        name: &str,
        task: BoxFuture<'static, ()>,
    ) -> Result<TaskHandle>;

    /// Runs `task` immediately and then once every `period` until it breaks,
    /// its handle is cancelled, or the executor shuts down.
    fn schedule_recurring(
        &self,
        name: &str,
        period: Duration,
        task: RecurringTask,
    ) -> Result<TaskHandle>;
}

/// Cancellation handle for scheduled work
///
/// Dropping the handle does not cancel the task; call [`cancel`](TaskHandle::cancel).
#[derive(Debug, Clone)]
pub struct TaskHandle {
    name: String,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn new(
        name: impl Into<String>,
        token: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            token,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
