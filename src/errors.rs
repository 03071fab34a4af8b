//! Replica Set Topology and Index Catalog Error Hierarchy
//!
//! Defines the error types surfaced by the monitor registry, the background
//! task executor and the index catalog, categorized by subsystem.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Replica set discovery and registry failures
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Background task scheduling failures
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// Configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Index catalog bookkeeping failures
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// Monitor creation requested after the registry was shut down
    #[error("Unable to get monitor for '{set_name}' due to shutdown")]
    ShutdownInProgress { set_name: String },

    /// Connection string does not identify a replica set
    #[error("Connection string '{0}' does not name a replica set")]
    NotAReplicaSet(String),

    /// Malformed host, connection string or URI
    #[error("Failed to parse: {0}")]
    FailedToParse(String),

    /// A probed member reported membership in a different set
    #[error("Host reported set name '{actual}' but expected '{expected}'")]
    SetNameMismatch { expected: String, actual: String },

    /// Host probing failures
    #[error(transparent)]
    Network(#[from] NetworkError),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Probe returned an error from the remote host
    #[error("Probe of {host} failed: {reason}")]
    ProbeFailed { host: String, reason: String },

    /// Probe did not complete in time
    #[error("Probe of {host} timed out after {timeout:?}")]
    ProbeTimeout { host: String, timeout: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Work scheduled after `shutdown()`
    #[error("Task executor is shutting down")]
    ShutdownInProgress,

    /// Work scheduled before `startup()`
    #[error("Task executor has not been started")]
    NotStarted,

    /// `startup()` called twice
    #[error("Task executor already started")]
    AlreadyStarted,

    /// Worker runtime could not be created
    #[error("Failed to start worker runtime: {0}")]
    RuntimeBuild(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Index with name '{0}' already exists")]
    IndexAlreadyExists(String),

    #[error("Index build for '{0}' already in progress")]
    IndexBuildAlreadyInProgress(String),

    #[error("Index '{0}' not found")]
    IndexNotFound(String),

    #[error("No index build in progress for '{0}'")]
    IndexBuildNotFound(String),

    #[error("Cannot drop the _id index")]
    CannotDropIdIndex,
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::Topology(TopologyError::Network(e))
    }
}

impl Error {
    /// True for the post-shutdown registry failure, which callers should treat
    /// as a programming error rather than retry.
    pub fn is_shutdown_in_progress(&self) -> bool {
        matches!(
            self,
            Error::Topology(TopologyError::ShutdownInProgress { .. })
                | Error::Executor(ExecutorError::ShutdownInProgress)
        )
    }
}
