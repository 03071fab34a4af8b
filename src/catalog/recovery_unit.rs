#[cfg(test)]
use mockall::automock;

use super::Timestamp;

/// Storage-side view of the operation currently reading the catalog
#[cfg_attr(test, automock)]
pub trait RecoveryUnit: Send + Sync {
    /// Timestamp the operation reads at, or `None` to read the latest data.
    fn point_in_time_read_timestamp(&self) -> Option<Timestamp>;
}

/// Fixed read timestamp for the lifetime of one operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSnapshot {
    read_ts: Option<Timestamp>,
}

impl ReadSnapshot {
    pub fn at(ts: Timestamp) -> Self {
        Self { read_ts: Some(ts) }
    }

    pub fn latest() -> Self {
        Self { read_ts: None }
    }
}

impl RecoveryUnit for ReadSnapshot {
    fn point_in_time_read_timestamp(&self) -> Option<Timestamp> {
        self.read_ts
    }
}
