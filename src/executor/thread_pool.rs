use std::ops::ControlFlow;
use std::thread::JoinHandle;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::RecurringTask;
use super::TaskExecutor;
use super::TaskHandle;
use crate::ExecutorConfig;
use crate::ExecutorError;
use crate::Result;

/// Task executor backed by a dedicated multi-threaded tokio runtime
///
/// Every task runs under a child of one root [`CancellationToken`], so
/// `shutdown()` stops recurring work at its next await point, and a
/// [`TaskTracker`] lets `join()` wait until nothing is left running.
///
/// The runtime is owned by a driver thread that parks until shutdown, drains
/// the tracker and then tears the runtime down. `join()` only joins that
/// thread, so it blocks the same way from sync and async callers.
pub struct ThreadPoolTaskExecutor {
    config: ExecutorConfig,
    driver: Mutex<Option<JoinHandle<()>>>,
    handle: Mutex<Option<Handle>>,
    shutdown_token: CancellationToken,
    tracker: TaskTracker,
}

impl std::fmt::Debug for ThreadPoolTaskExecutor {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ThreadPoolTaskExecutor")
            .field("config", &self.config)
            .field("shutdown", &self.shutdown_token.is_cancelled())
            .field("tasks", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl ThreadPoolTaskExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            driver: Mutex::new(None),
            handle: Mutex::new(None),
            shutdown_token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Number of scheduled tasks that have not finished yet
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    fn spawn_handle(&self) -> Result<Handle> {
        if self.shutdown_token.is_cancelled() {
            return Err(ExecutorError::ShutdownInProgress.into());
        }
        self.handle
            .lock()
            .clone()
            .ok_or_else(|| ExecutorError::NotStarted.into())
    }
}

impl TaskExecutor for ThreadPoolTaskExecutor {
    fn startup(&self) -> Result<()> {
        let mut driver_guard = self.driver.lock();
        if driver_guard.is_some() {
            return Err(ExecutorError::AlreadyStarted.into());
        }
        if self.shutdown_token.is_cancelled() {
            return Err(ExecutorError::ShutdownInProgress.into());
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .thread_name(self.config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(ExecutorError::RuntimeBuild)?;
        let handle = runtime.handle().clone();

        let token = self.shutdown_token.clone();
        let tracker = self.tracker.clone();
        let timeout = self.config.shutdown_timeout();
        let thread_name = self.config.thread_name.clone();
        let driver = std::thread::Builder::new()
            .name(format!("{}-driver", self.config.thread_name))
            .spawn(move || {
                let drained = runtime.block_on(async {
                    token.cancelled().await;
                    tokio::time::timeout(timeout, tracker.wait()).await.is_ok()
                });
                if !drained {
                    warn!(
                        remaining = tracker.len(),
                        ?timeout,
                        "Task executor did not drain before the shutdown timeout"
                    );
                }
                runtime.shutdown_timeout(timeout);
                debug!(%thread_name, "Worker runtime stopped");
            })
            .map_err(ExecutorError::RuntimeBuild)?;

        *self.handle.lock() = Some(handle);
        *driver_guard = Some(driver);

        info!(
            thread_name = %self.config.thread_name,
            worker_threads = self.config.worker_threads,
            "Task executor started"
        );
        Ok(())
    }

    fn shutdown(&self) {
        if self.shutdown_token.is_cancelled() {
            return;
        }
        debug!(thread_name = %self.config.thread_name, "Task executor shutting down");
        self.shutdown_token.cancel();
        self.tracker.close();
    }

    fn join(&self) {
        self.shutdown();

        let Some(driver) = self.driver.lock().take() else {
            return;
        };
        self.handle.lock().take();

        if driver.join().is_err() {
            warn!(thread_name = %self.config.thread_name, "Task executor driver thread panicked");
            return;
        }
        info!(thread_name = %self.config.thread_name, "Task executor joined");
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    fn schedule(
        &self,
        name: &str,
        task: BoxFuture<'static, ()>,
    ) -> Result<TaskHandle> {
        let handle = self.spawn_handle()?;
        let token = self.shutdown_token.child_token();
        let task_token = token.clone();
        let task_name = name.to_string();

        self.tracker.spawn_on(
            async move {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        trace!(task = %task_name, "Task cancelled");
                    }
                    _ = task => {}
                }
            },
            &handle,
        );

        Ok(TaskHandle::new(name, token))
    }

    fn schedule_recurring(
        &self,
        name: &str,
        period: Duration,
        mut task: RecurringTask,
    ) -> Result<TaskHandle> {
        let handle = self.spawn_handle()?;
        let token = self.shutdown_token.child_token();
        let task_token = token.clone();
        let task_name = name.to_string();

        self.tracker.spawn_on(
            async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        biased;
                        _ = task_token.cancelled() => break,
                        _ = interval.tick() => {}
                    }

                    let round = task();
                    let flow = tokio::select! {
                        biased;
                        _ = task_token.cancelled() => break,
                        flow = round => flow,
                    };

                    if let ControlFlow::Break(()) = flow {
                        debug!(task = %task_name, "Recurring task finished");
                        break;
                    }
                }
                trace!(task = %task_name, "Recurring task stopped");
            },
            &handle,
        );

        Ok(TaskHandle::new(name, token))
    }
}

impl Drop for ThreadPoolTaskExecutor {
    // The driver thread notices the cancellation and tears the runtime down
    // on its own; its handle is detached here.
    fn drop(&mut self) {
        self.shutdown_token.cancel();
        self.tracker.close();
    }
}
