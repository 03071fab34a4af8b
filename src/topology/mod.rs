//! Replica set topology tracking
//!
//! [`ReplicaSetMonitorManager`] deduplicates one [`ReplicaSetMonitor`] per
//! replica set name and owns the executor their refreshes run on. Monitors
//! publish what they discover through the [`ReplicaSetChangeNotifier`].
mod connection_string;
mod host_and_port;
mod manager;
mod monitor;
mod notifier;
mod prober;
mod uri;

pub use connection_string::*;
pub use host_and_port::*;
pub use manager::*;
pub use monitor::*;
pub use notifier::*;
pub use prober::*;
pub use uri::*;
