use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Logical commit time: seconds plus an increment ordering events within one second
///
/// Ordered by `secs`, then `inc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    secs: u32,
    inc: u32,
}

impl Timestamp {
    pub const MIN: Timestamp = Timestamp::new(0, 0);
    pub const MAX: Timestamp = Timestamp::new(u32::MAX, u32::MAX);

    pub const fn new(
        secs: u32,
        inc: u32,
    ) -> Self {
        Self { secs, inc }
    }

    pub fn secs(&self) -> u32 {
        self.secs
    }

    pub fn inc(&self) -> u32 {
        self.inc
    }

    pub fn is_null(&self) -> bool {
        self.secs == 0
    }

    /// Packs the timestamp into one integer with the same ordering.
    pub fn as_u64(&self) -> u64 {
        ((self.secs as u64) << 32) | self.inc as u64
    }
}

impl From<u64> for Timestamp {
    fn from(v: u64) -> Self {
        Self::new((v >> 32) as u32, v as u32)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Timestamp({}, {})", self.secs, self.inc)
    }
}
