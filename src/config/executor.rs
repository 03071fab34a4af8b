use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Worker pool parameters for the executor that runs topology refreshes
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExecutorConfig {
    /// Name given to every worker thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Number of worker threads
    ///
    /// Range: 1-64
    /// Default: 2
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Upper bound on how long `join()` waits for outstanding work
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_thread_name() -> String {
    "ReplicaSetMonitor-TaskExecutor".to_string()
}

fn default_worker_threads() -> usize {
    2
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            worker_threads: default_worker_threads(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.thread_name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "executor thread_name cannot be empty".into(),
            )));
        }

        if !(1..=64).contains(&self.worker_threads) {
            return Err(Error::Config(ConfigError::Message(format!(
                "executor worker_threads must be between 1 and 64, got {}",
                self.worker_threads
            ))));
        }

        if self.shutdown_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "executor shutdown_timeout_ms must be greater than 0".into(),
            )));
        }

        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
