use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;
use std::time::Instant;

use arc_swap::ArcSwap;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::ConnectionString;
use crate::HostAndPort;
use crate::HostProber;
use crate::MonitorConfig;
use crate::NetworkError;
use crate::ProbeReply;
use crate::RecurringTask;
use crate::ReplicaSetChangeNotifier;
use crate::Result;
use crate::TaskExecutor;
use crate::TaskHandle;
use crate::TopologyError;

/// Reported ping for members that have never answered a probe
pub const UNKNOWN_PING_MILLIS: i64 = i32::MAX as i64;

/// Probe rounds allowed within one refresh while new members keep appearing
const MAX_DISCOVERY_ROUNDS: usize = 8;

static NEXT_MONITOR_ID: AtomicU64 = AtomicU64::new(1);

/// Routing preference used by [`ReplicaSetMonitor::select_host`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPreference {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

/// One member as last observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub host: HostAndPort,
    pub is_up: bool,
    pub is_master: bool,
    /// Round-trip time of the last successful probe
    pub ping_time: Option<Duration>,
    pub tags: BTreeMap<String, String>,
}

impl Node {
    fn new(host: HostAndPort) -> Self {
        Self {
            host,
            is_up: false,
            is_master: false,
            ping_time: None,
            tags: BTreeMap::new(),
        }
    }

    fn mark_down(&mut self) {
        self.is_up = false;
        self.is_master = false;
    }

    fn ping_millis(&self) -> i64 {
        self.ping_time
            .map(|p| (p.as_millis() as i64).min(UNKNOWN_PING_MILLIS))
            .unwrap_or(UNKNOWN_PING_MILLIS)
    }
}

/// Immutable snapshot of a replica set's topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetState {
    pub set_name: String,
    /// Keyed by host so iteration order is stable
    pub nodes: BTreeMap<HostAndPort, Node>,
    pub primary: Option<HostAndPort>,
}

type ProbeOutcome = (HostAndPort, Result<ProbeReply>, Duration);

impl SetState {
    fn from_seeds(conn_str: &ConnectionString) -> Self {
        Self {
            set_name: conn_str.set_name().to_string(),
            nodes: conn_str
                .servers()
                .iter()
                .map(|h| (h.clone(), Node::new(h.clone())))
                .collect(),
            primary: None,
        }
    }

    pub fn hosts(&self) -> Vec<HostAndPort> {
        self.nodes.keys().cloned().collect()
    }

    pub fn connection_string(&self) -> ConnectionString {
        ConnectionString::for_replica_set(self.set_name.clone(), self.hosts())
    }

    /// Folds one round of probe results into a new snapshot.
    ///
    /// A primary's host list is authoritative: members it does not list are
    /// dropped. Without a primary, every member mentioned by any responder is
    /// added.
    fn apply(
        &self,
        results: &[ProbeOutcome],
    ) -> Self {
        let mut next = self.clone();
        let mut discovered = BTreeSet::new();
        let mut confirmed: Option<(HostAndPort, Vec<HostAndPort>)> = None;

        for (host, outcome, rtt) in results {
            match outcome {
                Ok(reply) if reply.set_name.as_deref() == Some(self.set_name.as_str()) => {
                    let node = next.nodes.entry(host.clone()).or_insert_with(|| Node::new(host.clone()));
                    node.is_up = true;
                    node.is_master = reply.is_primary;
                    node.ping_time = Some(*rtt);
                    node.tags = reply.tags.clone();

                    discovered.extend(reply.hosts.iter().cloned());
                    if let Some(primary) = &reply.primary {
                        discovered.insert(primary.clone());
                    }
                    if reply.is_primary {
                        confirmed = Some((host.clone(), reply.hosts.clone()));
                    }
                }
                Ok(reply) => {
                    let err = TopologyError::SetNameMismatch {
                        expected: self.set_name.clone(),
                        actual: reply.set_name.clone().unwrap_or_default(),
                    };
                    warn!(set_name = %self.set_name, %host, "{}", err);
                    if let Some(node) = next.nodes.get_mut(host) {
                        node.mark_down();
                    }
                }
                Err(e) => {
                    debug!(set_name = %self.set_name, %host, "Probe failed: {}", e);
                    if let Some(node) = next.nodes.get_mut(host) {
                        node.mark_down();
                    }
                }
            }
        }

        match confirmed {
            Some((primary, members)) => {
                // Another member may still claim to be primary from a stale term
                for (host, node) in next.nodes.iter_mut() {
                    if *host != primary {
                        node.is_master = false;
                    }
                }
                next.nodes
                    .retain(|host, _| *host == primary || members.contains(host));
                for host in members {
                    next.nodes.entry(host.clone()).or_insert_with(|| Node::new(host));
                }
                next.primary = Some(primary);
            }
            None => {
                for host in discovered {
                    next.nodes.entry(host.clone()).or_insert_with(|| Node::new(host));
                }
                next.primary = next
                    .nodes
                    .values()
                    .find(|n| n.is_up && n.is_master)
                    .map(|n| n.host.clone());
            }
        }

        next
    }

    fn nearest<'a>(
        &self,
        candidates: impl Iterator<Item = &'a Node>,
    ) -> Option<HostAndPort> {
        candidates
            .filter(|n| n.is_up)
            .min_by_key(|n| n.ping_time.unwrap_or(Duration::MAX))
            .map(|n| n.host.clone())
    }
}

/// Tracks the topology of one replica set
///
/// Created and indexed by
/// [`ReplicaSetMonitorManager`](crate::ReplicaSetMonitorManager); callers own it
/// through `Arc` handles. Refreshes run on the shared executor and only hold a
/// [`Weak`] to the monitor between rounds, so dropping the last handle ends
/// the background work.
pub struct ReplicaSetMonitor {
    /// Process-unique, increasing with creation order
    id: u64,
    set_name: String,
    seeds: ConnectionString,
    state: ArcSwap<SetState>,
    prober: Arc<dyn HostProber>,
    notifier: Weak<ReplicaSetChangeNotifier>,
    config: MonitorConfig,
    refresh_handle: Mutex<Option<TaskHandle>>,
    refresh_lock: tokio::sync::Mutex<()>,
    is_removed: AtomicBool,
}

impl std::fmt::Debug for ReplicaSetMonitor {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ReplicaSetMonitor")
            .field("id", &self.id)
            .field("set_name", &self.set_name)
            .field("state", &self.state.load())
            .field("is_removed", &self.is_removed())
            .finish_non_exhaustive()
    }
}

impl ReplicaSetMonitor {
    /// Builds a monitor seeded from `conn_str`, which must name a replica set.
    pub fn new(
        conn_str: &ConnectionString,
        prober: Arc<dyn HostProber>,
        notifier: Weak<ReplicaSetChangeNotifier>,
        config: MonitorConfig,
    ) -> Result<Self> {
        let set_name = conn_str.require_set_name()?.to_string();
        Ok(Self {
            id: NEXT_MONITOR_ID.fetch_add(1, Ordering::Relaxed),
            set_name,
            seeds: conn_str.clone(),
            state: ArcSwap::from_pointee(SetState::from_seeds(conn_str)),
            prober,
            notifier,
            config,
            refresh_handle: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            is_removed: AtomicBool::new(false),
        })
    }

    /// Announces the set and starts the recurring refresh on `executor`.
    ///
    /// A scheduling failure is logged and otherwise ignored; the monitor stays
    /// usable with its seed list.
    pub fn init(
        self: &Arc<Self>,
        executor: &dyn TaskExecutor,
    ) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.on_found_set(&self.set_name, self.id);
        }

        let weak = Arc::downgrade(self);
        let task: RecurringTask = Box::new(move || {
            let weak = weak.clone();
            async move {
                let Some(monitor) = weak.upgrade() else {
                    return ControlFlow::Break(());
                };
                if monitor.is_removed() {
                    return ControlFlow::Break(());
                }
                monitor.refresh().await;
                ControlFlow::Continue(())
            }
            .boxed()
        });

        match executor.schedule_recurring(
            &format!("ReplicaSetMonitor-refresh-{}", self.set_name),
            self.config.refresh_period(),
            task,
        ) {
            Ok(handle) => {
                *self.refresh_handle.lock() = Some(handle);
            }
            Err(e) => {
                warn!(set_name = %self.set_name, "Failed to schedule topology refresh: {}", e);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.set_name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Seed list the monitor was created with
    pub fn seeds(&self) -> &ConnectionString {
        &self.seeds
    }

    /// Current topology snapshot
    pub fn snapshot(&self) -> Arc<SetState> {
        self.state.load_full()
    }

    /// Connection string built from the currently known members
    pub fn server_address(&self) -> ConnectionString {
        self.state.load().connection_string()
    }

    pub fn hosts(&self) -> Vec<HostAndPort> {
        self.state.load().hosts()
    }

    pub fn primary(&self) -> Option<HostAndPort> {
        self.state.load().primary.clone()
    }

    pub fn is_host_up(
        &self,
        host: &HostAndPort,
    ) -> bool {
        self.state.load().nodes.get(host).map(|n| n.is_up).unwrap_or(false)
    }

    pub fn is_known_to_have_good_primary(&self) -> bool {
        let state = self.state.load();
        state
            .primary
            .as_ref()
            .and_then(|p| state.nodes.get(p))
            .map(|n| n.is_up && n.is_master)
            .unwrap_or(false)
    }

    /// Picks a member for `preference` from the current snapshot without probing.
    pub fn select_host(
        &self,
        preference: ReadPreference,
    ) -> Option<HostAndPort> {
        let state = self.state.load();
        let primary = || {
            state
                .primary
                .clone()
                .filter(|p| state.nodes.get(p).map(|n| n.is_up).unwrap_or(false))
        };
        let secondary = || state.nearest(state.nodes.values().filter(|n| !n.is_master));

        match preference {
            ReadPreference::Primary => primary(),
            ReadPreference::PrimaryPreferred => primary().or_else(secondary),
            ReadPreference::Secondary => secondary(),
            ReadPreference::SecondaryPreferred => secondary().or_else(primary),
            ReadPreference::Nearest => state.nearest(state.nodes.values()),
        }
    }

    /// Marks `host` down until the next successful probe.
    pub fn failed_host(
        &self,
        host: &HostAndPort,
        reason: &str,
    ) {
        let mut was_known = false;
        self.state.rcu(|current| {
            let mut next = SetState::clone(current);
            was_known = false;
            if let Some(node) = next.nodes.get_mut(host) {
                was_known = true;
                node.mark_down();
            }
            if next.primary.as_ref() == Some(host) {
                next.primary = None;
            }
            next
        });
        if was_known {
            info!(set_name = %self.set_name, %host, reason, "Marking host as failed");
        }
    }

    /// Stops future refreshes; the registry calls this when it forgets the set.
    pub fn mark_as_removed(&self) {
        self.is_removed.store(true, Ordering::Release);
        if let Some(handle) = self.refresh_handle.lock().take() {
            handle.cancel();
        }
    }

    pub fn is_removed(&self) -> bool {
        self.is_removed.load(Ordering::Acquire)
    }

    /// Probes every known member, following newly discovered ones, and
    /// publishes the resulting change if there is one.
    ///
    /// Concurrent callers are serialized; probe failures only affect the
    /// snapshot and are never returned.
    pub async fn refresh(&self) {
        let _guard = self.refresh_lock.lock().await;
        let before = self.state.load_full();
        let started = Instant::now();
        let mut probed = BTreeSet::new();

        for round in 0..MAX_DISCOVERY_ROUNDS {
            let pending: Vec<HostAndPort> = self
                .state
                .load()
                .nodes
                .keys()
                .filter(|h| !probed.contains(*h))
                .cloned()
                .collect();
            if pending.is_empty() {
                break;
            }
            trace!(set_name = %self.set_name, round, hosts = pending.len(), "Probing members");

            probed.extend(pending.iter().cloned());
            let results = futures::future::join_all(pending.into_iter().map(|host| self.probe_one(host))).await;
            self.state.rcu(|current| current.apply(&results));
        }

        let after = self.state.load_full();
        debug!(
            set_name = %self.set_name,
            elapsed = ?started.elapsed(),
            primary = ?after.primary,
            members = after.nodes.len(),
            "Refresh finished"
        );
        self.publish_changes(&before, &after);
    }

    async fn probe_one(
        &self,
        host: HostAndPort,
    ) -> ProbeOutcome {
        let timeout = self.config.probe_timeout();
        let start = Instant::now();
        let outcome = match tokio::time::timeout(timeout, self.prober.probe(&host)).await {
            Ok(reply) => reply,
            Err(_) => Err(NetworkError::ProbeTimeout {
                host: host.to_string(),
                timeout,
            }
            .into()),
        };
        (host, outcome, start.elapsed())
    }

    fn publish_changes(
        &self,
        before: &SetState,
        after: &SetState,
    ) {
        let membership_changed = !before.nodes.keys().eq(after.nodes.keys());
        let primary_changed = before.primary != after.primary;
        if !membership_changed && !primary_changed {
            return;
        }
        let Some(notifier) = self.notifier.upgrade() else {
            return;
        };

        match &after.primary {
            Some(primary) => {
                info!(set_name = %self.set_name, %primary, "Confirmed replica set topology");
                notifier.on_confirmed_set(&after.connection_string(), primary, self.id);
            }
            None if membership_changed => {
                notifier.on_possible_set(&after.connection_string(), self.id);
            }
            None => {
                warn!(set_name = %self.set_name, "Replica set lost its primary");
            }
        }
    }

    /// Appends this set's diagnostic state under its name.
    ///
    /// The full form lists every member; the FTDC form only maps each member
    /// address to its ping time.
    pub fn append_info(
        &self,
        builder: &mut Map<String, Value>,
        for_ftdc: bool,
    ) {
        let state = self.state.load();
        let info = if for_ftdc {
            let pings: Map<String, Value> = state
                .nodes
                .values()
                .map(|n| (n.host.to_string(), json!(n.ping_millis())))
                .collect();
            Value::Object(pings)
        } else {
            let hosts: Vec<Value> = state
                .nodes
                .values()
                .map(|n| {
                    let mut host = json!({
                        "addr": n.host.to_string(),
                        "ok": n.is_up,
                        "ismaster": n.is_master,
                        "hidden": false,
                        "secondary": n.is_up && !n.is_master,
                        "pingTimeMillis": n.ping_millis(),
                    });
                    if !n.tags.is_empty() {
                        host["tags"] = json!(n.tags);
                    }
                    host
                })
                .collect();
            json!({ "hosts": hosts })
        };
        builder.insert(self.set_name.clone(), info);
    }
}

impl Drop for ReplicaSetMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_handle.get_mut().take() {
            handle.cancel();
        }
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.on_dropped_set(&self.set_name, self.id);
        }
        debug!(set_name = %self.set_name, "Replica set monitor destroyed");
    }
}
