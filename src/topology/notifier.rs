//! Topology change broadcast
//!
//! Monitors report discovered changes here; any subsystem interested in
//! replica set membership registers a [`ReplicaSetChangeListener`].
//!
//! # Ordering
//!
//! A change is recorded in the per-set state table before any listener sees
//! it, so a listener calling [`ReplicaSetChangeNotifier::current_state`] from
//! inside a callback observes the change that triggered it. Listeners are
//! invoked outside the internal lock, in no particular order.
//!
//! # Ownership
//!
//! Each state entry is owned by the monitor that last published for its set.
//! Monitor ids only grow, so a replacement monitor takes over the entry and a
//! superseded monitor can neither overwrite it nor drop it.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::ConnectionString;
use crate::HostAndPort;

/// Last recorded view of one replica set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSetState {
    pub conn_str: ConnectionString,
    pub primary: Option<HostAndPort>,
    /// Bumped on every recorded change of this set
    pub version: u64,
}

/// Callbacks for replica set topology changes
pub trait ReplicaSetChangeListener: Send + Sync + 'static {
    /// A monitor started tracking `set_name`.
    fn on_found_set(
        &self,
        set_name: &str,
    );

    /// Membership changed but no primary has confirmed it yet.
    fn on_possible_set(
        &self,
        _state: &ReplicaSetState,
    ) {
    }

    /// A primary confirmed the membership in `state`.
    fn on_confirmed_set(
        &self,
        state: &ReplicaSetState,
    );

    /// The monitor for `set_name` went away.
    fn on_dropped_set(
        &self,
        _set_name: &str,
    ) {
    }
}

/// State entry plus the id of the monitor publishing it
struct TrackedSet {
    owner: u64,
    state: ReplicaSetState,
}

/// Cleanup state for a listener registration
struct ListenerCleanup {
    id: u64,
    listeners: Weak<DashMap<u64, Arc<dyn ReplicaSetChangeListener>>>,
}

/// Registration handle for a listener
///
/// When dropped, the listener is unregistered from the notifier.
pub struct ListenerHandle {
    cleanup: ListenerCleanup,
}

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.cleanup.id
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(listeners) = self.cleanup.listeners.upgrade() {
            listeners.remove(&self.cleanup.id);
            trace!(listener_id = self.cleanup.id, "Listener unregistered");
        }
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.cleanup.id).finish()
    }
}

/// Process-wide hub for replica set change notifications
///
/// Owned by the monitor registry; monitors only ever hold a [`Weak`] to it.
#[derive(Default)]
pub struct ReplicaSetChangeNotifier {
    listeners: Arc<DashMap<u64, Arc<dyn ReplicaSetChangeListener>>>,
    next_id: AtomicU64,
    states: Mutex<HashMap<String, TrackedSet>>,
}

impl std::fmt::Debug for ReplicaSetChangeNotifier {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ReplicaSetChangeNotifier")
            .field("listeners", &self.listeners.len())
            .field("states", &self.states.lock().len())
            .finish()
    }
}

impl ReplicaSetChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` until the returned handle is dropped.
    pub fn add_listener(
        &self,
        listener: Arc<dyn ReplicaSetChangeListener>,
    ) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, listener);
        trace!(listener_id = id, "Listener registered");

        ListenerHandle {
            cleanup: ListenerCleanup {
                id,
                listeners: Arc::downgrade(&self.listeners),
            },
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn current_state(
        &self,
        set_name: &str,
    ) -> Option<ReplicaSetState> {
        self.states.lock().get(set_name).map(|t| t.state.clone())
    }

    pub(crate) fn on_found_set(
        &self,
        set_name: &str,
        owner: u64,
    ) {
        {
            let mut states = self.states.lock();
            match states.get_mut(set_name) {
                Some(tracked) if tracked.owner > owner => {
                    trace!(set_name, owner, "Ignoring found set from superseded monitor");
                    return;
                }
                Some(tracked) => tracked.owner = owner,
                None => {
                    states.insert(
                        set_name.to_string(),
                        TrackedSet {
                            owner,
                            state: ReplicaSetState {
                                conn_str: ConnectionString::default(),
                                primary: None,
                                version: 0,
                            },
                        },
                    );
                }
            }
        }
        debug!(set_name, owner, "Signaling found set");

        for listener in self.snapshot_listeners() {
            listener.on_found_set(set_name);
        }
    }

    pub(crate) fn on_possible_set(
        &self,
        conn_str: &ConnectionString,
        owner: u64,
    ) {
        let Some(state) = self.record(conn_str, None, owner) else {
            return;
        };
        debug!(%conn_str, "Signaling possible set");

        for listener in self.snapshot_listeners() {
            listener.on_possible_set(&state);
        }
    }

    pub(crate) fn on_confirmed_set(
        &self,
        conn_str: &ConnectionString,
        primary: &HostAndPort,
        owner: u64,
    ) {
        let Some(state) = self.record(conn_str, Some(primary.clone()), owner) else {
            return;
        };
        debug!(%conn_str, %primary, "Signaling confirmed set");

        for listener in self.snapshot_listeners() {
            listener.on_confirmed_set(&state);
        }
    }

    /// Forgets `set_name` unless another monitor has taken it over since.
    pub(crate) fn on_dropped_set(
        &self,
        set_name: &str,
        owner: u64,
    ) {
        {
            let mut states = self.states.lock();
            if let Some(tracked) = states.get(set_name) {
                if tracked.owner != owner {
                    trace!(set_name, owner, current = tracked.owner, "Set is owned by another monitor");
                    return;
                }
                states.remove(set_name);
            }
        }
        debug!(set_name, owner, "Signaling dropped set");

        for listener in self.snapshot_listeners() {
            listener.on_dropped_set(set_name);
        }
    }

    fn record(
        &self,
        conn_str: &ConnectionString,
        primary: Option<HostAndPort>,
        owner: u64,
    ) -> Option<ReplicaSetState> {
        let mut states = self.states.lock();
        let version = match states.get(conn_str.set_name()) {
            Some(tracked) if tracked.owner > owner => {
                trace!(%conn_str, owner, "Ignoring change from superseded monitor");
                return None;
            }
            Some(tracked) => tracked.state.version + 1,
            None => 1,
        };
        let state = ReplicaSetState {
            conn_str: conn_str.clone(),
            primary,
            version,
        };
        states.insert(
            conn_str.set_name().to_string(),
            TrackedSet {
                owner,
                state: state.clone(),
            },
        );
        Some(state)
    }

    // Listeners are cloned out so callbacks never run under a map shard lock.
    fn snapshot_listeners(&self) -> Vec<Arc<dyn ReplicaSetChangeListener>> {
        self.listeners.iter().map(|entry| entry.value().clone()).collect()
    }
}
