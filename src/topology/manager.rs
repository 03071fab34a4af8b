use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::constants::REPORT_KEY_PING_TIMES;
use crate::constants::REPORT_KEY_REPLICA_SETS;
use crate::ConnectionString;
use crate::ExecutorConfig;
use crate::ExecutorError;
use crate::HostProber;
use crate::MongoUri;
use crate::ReplicaSetChangeNotifier;
use crate::ReplicaSetMonitor;
use crate::Result;
use crate::Settings;
use crate::TaskExecutor;
use crate::ThreadPoolTaskExecutor;
use crate::TopologyError;

/// Builds the executor the first time a monitor needs one
pub type ExecutorFactory = Box<dyn Fn(&ExecutorConfig) -> Result<Arc<dyn TaskExecutor>> + Send + Sync>;

/// Registry bookkeeping guarded by the manager mutex
#[derive(Default)]
struct ManagerState {
    /// Non-owning index; callers hold the strong references
    monitors: HashMap<String, Weak<ReplicaSetMonitor>>,
    is_shutdown: bool,
}

/// Manages the lifetime of a set of replica set monitors
///
/// Deduplicates monitors by replica set name, provisions the shared task
/// executor on first use and tears it down on [`shutdown`](Self::shutdown).
/// One instance is created per process (or per test) and passed to whoever
/// needs it.
///
/// # Locking
///
/// A single mutex serializes every registry mutation and the executor's
/// one-time construction. It is never held while calling into a monitor or a
/// change listener.
pub struct ReplicaSetMonitorManager {
    settings: Settings,
    prober: Arc<dyn HostProber>,
    /// Outlives every monitor: monitors only hold a `Weak` to it
    notifier: Arc<ReplicaSetChangeNotifier>,
    executor_factory: ExecutorFactory,
    task_executor: OnceCell<Arc<dyn TaskExecutor>>,
    state: Mutex<ManagerState>,
}

impl std::fmt::Debug for ReplicaSetMonitorManager {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReplicaSetMonitorManager")
            .field("monitors", &state.monitors.keys().collect::<Vec<_>>())
            .field("is_shutdown", &state.is_shutdown)
            .field("has_executor", &self.task_executor.get().is_some())
            .finish_non_exhaustive()
    }
}

impl ReplicaSetMonitorManager {
    /// Creates a manager whose executor is a [`ThreadPoolTaskExecutor`].
    pub fn new(
        settings: Settings,
        prober: Arc<dyn HostProber>,
    ) -> Self {
        Self::with_executor_factory(
            settings,
            prober,
            Box::new(|config: &ExecutorConfig| {
                let executor: Arc<dyn TaskExecutor> = Arc::new(ThreadPoolTaskExecutor::new(config.clone()));
                Ok(executor)
            }),
        )
    }

    pub fn with_executor_factory(
        settings: Settings,
        prober: Arc<dyn HostProber>,
        executor_factory: ExecutorFactory,
    ) -> Self {
        Self {
            settings,
            prober,
            notifier: Arc::new(ReplicaSetChangeNotifier::new()),
            executor_factory,
            task_executor: OnceCell::new(),
            state: Mutex::new(ManagerState::default()),
        }
    }

    /// Returns the live monitor for `set_name`, if any. Never creates one.
    ///
    /// An entry whose monitor has been destroyed is pruned here.
    pub fn get_monitor(
        &self,
        set_name: &str,
    ) -> Option<Arc<ReplicaSetMonitor>> {
        let mut state = self.state.lock();
        let monitor = state.monitors.get(set_name)?.upgrade();
        if monitor.is_none() {
            state.monitors.remove(set_name);
            debug!(set_name, "Pruned destroyed replica set monitor");
        }
        monitor
    }

    /// Returns the monitor for the set named in `conn_str`, creating it if
    /// no live one exists.
    ///
    /// # Errors
    /// - `TopologyError::NotAReplicaSet` when `conn_str` carries no set name
    /// - `TopologyError::ShutdownInProgress` when a new monitor would be
    ///   needed after [`shutdown`](Self::shutdown)
    pub fn get_or_create_monitor(
        &self,
        conn_str: &ConnectionString,
    ) -> Result<Arc<ReplicaSetMonitor>> {
        let set_name = conn_str.require_set_name()?;

        let (monitor, executor) = {
            let mut state = self.state.lock();
            if let Some(monitor) = state.monitors.get(set_name).and_then(Weak::upgrade) {
                return Ok(monitor);
            }
            if state.is_shutdown {
                return Err(TopologyError::ShutdownInProgress {
                    set_name: set_name.to_string(),
                }
                .into());
            }

            let executor = self.setup_task_executor_in_lock(&state)?;

            info!(%conn_str, "Starting new replica set monitor");
            let monitor = Arc::new(ReplicaSetMonitor::new(
                conn_str,
                self.prober.clone(),
                Arc::downgrade(&self.notifier),
                self.settings.monitor.clone(),
            )?);
            state.monitors.insert(set_name.to_string(), Arc::downgrade(&monitor));
            (monitor, executor)
        };

        monitor.init(executor.as_ref());
        Ok(monitor)
    }

    /// Same as [`get_or_create_monitor`](Self::get_or_create_monitor), keyed by
    /// the URI's `replicaSet` option.
    pub fn get_or_create_monitor_for_uri(
        &self,
        uri: &MongoUri,
    ) -> Result<Arc<ReplicaSetMonitor>> {
        self.get_or_create_monitor(uri.connection_string())
    }

    /// Parses `seeds` as `setName/host[:port],...` and returns its monitor.
    /// Hosts without a port get the configured `default_port`.
    pub fn get_or_create_monitor_for_seeds(
        &self,
        seeds: &str,
    ) -> Result<Arc<ReplicaSetMonitor>> {
        let conn_str = ConnectionString::parse_with_default_port(seeds, self.settings.monitor.default_port)?;
        self.get_or_create_monitor(&conn_str)
    }

    /// Names of every tracked set, including ones whose monitor has been
    /// destroyed but not yet pruned by a lookup.
    pub fn get_all_set_names(&self) -> Vec<String> {
        self.state.lock().monitors.keys().cloned().collect()
    }

    /// Stops tracking `set_name`. A monitor still referenced elsewhere stays
    /// alive for its holders but stops refreshing and can no longer be found.
    pub fn remove_monitor(
        &self,
        set_name: &str,
    ) {
        let removed = self.state.lock().monitors.remove(set_name);
        let Some(weak) = removed else {
            return;
        };
        if let Some(monitor) = weak.upgrade() {
            monitor.mark_as_removed();
        }
        info!(set_name, "Removed replica set monitor");
    }

    /// Forgets every monitor. Meant for test teardown.
    pub fn remove_all_monitors(&self) {
        let monitors = std::mem::take(&mut self.state.lock().monitors);
        for monitor in monitors.values().filter_map(Weak::upgrade) {
            monitor.mark_as_removed();
        }
        debug!(count = monitors.len(), "Removed all replica set monitors");
    }

    /// Refuses further monitor creation and shuts down the executor, blocking
    /// until its work has quiesced. Later calls return immediately.
    pub fn shutdown(&self) {
        let executor = {
            let mut state = self.state.lock();
            if state.is_shutdown {
                return;
            }
            state.is_shutdown = true;
            self.task_executor.get().cloned()
        };

        let Some(executor) = executor else {
            debug!("No task executor to shut down");
            return;
        };

        info!("Shutting down task executor used for monitoring replica sets");
        executor.shutdown();
        executor.join();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().is_shutdown
    }

    /// Appends diagnostic state for every live monitor.
    ///
    /// Output lands under `replicaSets`, or `replicaSetPingTimesMillis` in the
    /// trimmed FTDC form. Monitors destroyed since the names were collected are
    /// skipped.
    pub fn report(
        &self,
        builder: &mut Map<String, Value>,
        for_ftdc: bool,
    ) {
        let mut set_stats = Map::new();
        for set_name in self.get_all_set_names() {
            if let Some(monitor) = self.get_monitor(&set_name) {
                monitor.append_info(&mut set_stats, for_ftdc);
            }
        }

        let key = if for_ftdc {
            REPORT_KEY_PING_TIMES
        } else {
            REPORT_KEY_REPLICA_SETS
        };
        builder.insert(key.to_string(), Value::Object(set_stats));
    }

    /// Returns the shared executor, constructing it if needed.
    pub fn get_executor(&self) -> Result<Arc<dyn TaskExecutor>> {
        let state = self.state.lock();
        if let Some(executor) = self.task_executor.get() {
            return Ok(executor.clone());
        }
        if state.is_shutdown {
            return Err(ExecutorError::ShutdownInProgress.into());
        }
        self.setup_task_executor_in_lock(&state)
    }

    pub fn get_notifier(&self) -> &ReplicaSetChangeNotifier {
        &self.notifier
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // Taking the guard proves the caller holds the manager mutex.
    fn setup_task_executor_in_lock(
        &self,
        _state: &ManagerState,
    ) -> Result<Arc<dyn TaskExecutor>> {
        self.task_executor
            .get_or_try_init(|| {
                let executor = (self.executor_factory)(&self.settings.executor)?;
                executor.startup()?;
                info!(
                    thread_name = %self.settings.executor.thread_name,
                    "Started task executor for monitoring replica sets"
                );
                Ok(executor)
            })
            .cloned()
    }
}

impl Drop for ReplicaSetMonitorManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
