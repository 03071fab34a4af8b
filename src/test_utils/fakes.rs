use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::ExecutorError;
use crate::HostAndPort;
use crate::HostProber;
use crate::NetworkError;
use crate::ProbeReply;
use crate::RecurringTask;
use crate::ReplicaSetChangeListener;
use crate::ReplicaSetState;
use crate::Result;
use crate::TaskExecutor;
use crate::TaskHandle;

/// Prober answering from a fixed table; unknown hosts fail
#[derive(Default)]
pub struct FakeProber {
    replies: Mutex<HashMap<HostAndPort, ProbeReply>>,
    probes: Mutex<Vec<HostAndPort>>,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reply(
        &self,
        host: HostAndPort,
        reply: ProbeReply,
    ) {
        self.replies.lock().insert(host, reply);
    }

    pub fn remove_reply(
        &self,
        host: &HostAndPort,
    ) {
        self.replies.lock().remove(host);
    }

    pub fn probe_count(
        &self,
        host: &HostAndPort,
    ) -> usize {
        self.probes.lock().iter().filter(|h| *h == host).count()
    }
}

#[async_trait]
impl HostProber for FakeProber {
    async fn probe(
        &self,
        host: &HostAndPort,
    ) -> Result<ProbeReply> {
        self.probes.lock().push(host.clone());
        self.replies.lock().get(host).cloned().ok_or_else(|| {
            NetworkError::ProbeFailed {
                host: host.to_string(),
                reason: "connection refused".into(),
            }
            .into()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Found(String),
    Possible(String),
    Confirmed(String, HostAndPort),
    Dropped(String),
}

/// Listener that records every callback in order
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().clone()
    }
}

impl ReplicaSetChangeListener for RecordingListener {
    fn on_found_set(
        &self,
        set_name: &str,
    ) {
        self.events.lock().push(ListenerEvent::Found(set_name.to_string()));
    }

    fn on_possible_set(
        &self,
        state: &ReplicaSetState,
    ) {
        self.events
            .lock()
            .push(ListenerEvent::Possible(state.conn_str.set_name().to_string()));
    }

    fn on_confirmed_set(
        &self,
        state: &ReplicaSetState,
    ) {
        if let Some(primary) = &state.primary {
            self.events.lock().push(ListenerEvent::Confirmed(
                state.conn_str.set_name().to_string(),
                primary.clone(),
            ));
        }
    }

    fn on_dropped_set(
        &self,
        set_name: &str,
    ) {
        self.events.lock().push(ListenerEvent::Dropped(set_name.to_string()));
    }
}

/// Executor that accepts work but never runs it
///
/// Keeps monitor lifetimes fully under test control: no background refresh
/// ever holds a strong reference.
#[derive(Default)]
pub struct IdleExecutor {
    started: AtomicBool,
    shut_down: AtomicBool,
    joins: AtomicUsize,
    scheduled: Mutex<Vec<TaskHandle>>,
}

impl IdleExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn join_count(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn scheduled(&self) -> Vec<TaskHandle> {
        self.scheduled.lock().clone()
    }

    fn accept(
        &self,
        name: &str,
    ) -> Result<TaskHandle> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ExecutorError::ShutdownInProgress.into());
        }
        let handle = TaskHandle::new(name, CancellationToken::new());
        self.scheduled.lock().push(handle.clone());
        Ok(handle)
    }
}

impl TaskExecutor for IdleExecutor {
    fn startup(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ExecutorError::AlreadyStarted.into());
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    fn join(&self) {
        self.shutdown();
        self.joins.fetch_add(1, Ordering::SeqCst);
    }

    fn is_shutdown(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn schedule(
        &self,
        name: &str,
        _task: BoxFuture<'static, ()>,
    ) -> Result<TaskHandle> {
        self.accept(name)
    }

    fn schedule_recurring(
        &self,
        name: &str,
        _period: Duration,
        _task: RecurringTask,
    ) -> Result<TaskHandle> {
        self.accept(name)
    }
}
