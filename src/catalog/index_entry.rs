use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

use super::Timestamp;
use crate::constants::ID_INDEX_NAME;

/// Ordered list of indexed fields and their direction (`1` ascending, `-1` descending)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPattern(Vec<(String, i32)>);

impl KeyPattern {
    pub fn new<K: Into<String>>(fields: impl IntoIterator<Item = (K, i32)>) -> Self {
        Self(fields.into_iter().map(|(k, d)| (k.into(), d)).collect())
    }

    pub fn fields(&self) -> &[(String, i32)] {
        &self.0
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("{ ")?;
        for (i, (field, direction)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {direction}")?;
        }
        f.write_str(" }")
    }
}

/// Static definition of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub key_pattern: KeyPattern,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDescriptor {
    pub fn new(
        name: impl Into<String>,
        key_pattern: KeyPattern,
        unique: bool,
    ) -> Self {
        Self {
            name: name.into(),
            key_pattern,
            unique,
        }
    }

    /// The mandatory `_id_` index every collection carries
    pub fn id_index() -> Self {
        Self::new(ID_INDEX_NAME, KeyPattern::new([("_id", 1)]), true)
    }

    pub fn is_id_index(&self) -> bool {
        self.name == ID_INDEX_NAME
    }
}

/// Catalog's runtime record for one index
///
/// Shared through `Arc` between the catalog containers and any iterator
/// snapshot taken from them.
#[derive(Debug)]
pub struct IndexCatalogEntry {
    descriptor: IndexDescriptor,
    minimum_visible_snapshot: RwLock<Option<Timestamp>>,
    ready: AtomicBool,
}

impl IndexCatalogEntry {
    pub fn new(descriptor: IndexDescriptor) -> Self {
        Self {
            descriptor,
            minimum_visible_snapshot: RwLock::new(None),
            ready: AtomicBool::new(false),
        }
    }

    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Oldest read timestamp allowed to use this index, if it was built under one.
    pub fn minimum_visible_snapshot(&self) -> Option<Timestamp> {
        *self.minimum_visible_snapshot.read()
    }

    /// Raises the minimum visible snapshot to `ts`. Older values are ignored.
    pub fn set_minimum_visible_snapshot(
        &self,
        ts: Timestamp,
    ) {
        let mut current = self.minimum_visible_snapshot.write();
        if current.map_or(true, |existing| ts > existing) {
            *current = Some(ts);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn set_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// True unless a reader at `read_ts` predates the snapshot this index
    /// became visible at. Without a read timestamp every index is visible.
    pub fn is_visible_at(
        &self,
        read_ts: Option<Timestamp>,
    ) -> bool {
        match (read_ts, self.minimum_visible_snapshot()) {
            (Some(read_ts), Some(min_visible)) if read_ts < min_visible => {
                trace!(index = %self.name(), %read_ts, %min_visible, "Index not visible at read timestamp");
                false
            }
            _ => true,
        }
    }
}
