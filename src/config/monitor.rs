use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Topology refresh parameters shared by every replica set monitor
///
/// # Usage
///
/// ```toml
/// [monitor]
/// refresh_period_ms = 30000
/// probe_timeout_ms = 5000
/// default_port = 27017
/// ```
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MonitorConfig {
    /// Interval between two background refreshes of one replica set
    ///
    /// Range: 100-3600000 (100ms to 1 hour)
    /// Default: 30000
    #[serde(default = "default_refresh_period_ms")]
    pub refresh_period_ms: u64,

    /// Upper bound for a single host probe
    ///
    /// Must be non-zero and shorter than `refresh_period_ms` so that one
    /// refresh round finishes before the next one is due.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Port assumed for seed hosts given without one
    #[serde(default = "default_port")]
    pub default_port: u16,
}

fn default_refresh_period_ms() -> u64 {
    30_000
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_port() -> u16 {
    27017
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_period_ms: default_refresh_period_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            default_port: default_port(),
        }
    }
}

impl MonitorConfig {
    /// Validates configuration parameters
    ///
    /// Returns error if:
    /// - `refresh_period_ms` is out of range (100-3600000)
    /// - `probe_timeout_ms` is zero or not shorter than the refresh period
    /// - `default_port` is zero
    pub fn validate(&self) -> Result<()> {
        if !(100..=3_600_000).contains(&self.refresh_period_ms) {
            return Err(Error::Config(ConfigError::Message(format!(
                "monitor refresh_period_ms must be between 100 and 3600000, got {}",
                self.refresh_period_ms
            ))));
        }

        if self.probe_timeout_ms == 0 || self.probe_timeout_ms >= self.refresh_period_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "monitor probe_timeout_ms must be in 1..{}, got {}",
                self.refresh_period_ms, self.probe_timeout_ms
            ))));
        }

        if self.default_port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "monitor default_port cannot be 0".into(),
            )));
        }

        Ok(())
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_period_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
