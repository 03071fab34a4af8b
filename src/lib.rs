//! Replica set monitor registry and snapshot-aware index catalog iteration
//!
//! - [`ReplicaSetMonitorManager`]: one monitor per replica set name, a shared
//!   background executor, and topology change broadcast through
//!   [`ReplicaSetChangeNotifier`].
//! - [`IndexCatalog`]: ready and in-progress index builds, walked through
//!   [`ReadyIndexesIterator`] or [`AllIndexesIterator`].
//!
//! Configuration is loaded with [`Settings::new`] and must be validated before
//! use.

mod catalog;
mod config;
mod constants;
mod errors;
mod executor;
mod topology;

pub use catalog::*;
pub use config::*;
pub use constants::DEFAULT_PORT;
pub use constants::ID_INDEX_NAME;
pub use errors::*;
pub use executor::*;
pub use topology::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
