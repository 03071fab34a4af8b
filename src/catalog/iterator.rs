//! Forward-only, non-restartable walks over index catalog entries
//!
//! Both iterators start unpositioned and only touch their source on the first
//! [`IndexIterator::more`] or [`Iterator::next`] call. Once positioned they keep
//! the upcoming entry prefetched, so `more` and `next` may be interleaved
//! freely without skipping or repeating entries. After the last entry both
//! keep answering `false` / `None`.

use std::slice;
use std::sync::Arc;
use std::vec;

use super::IndexCatalogEntry;
use super::RecoveryUnit;

/// Lazy sequence of index entries
pub trait IndexIterator: Iterator<Item = Arc<IndexCatalogEntry>> {
    /// Whether [`Iterator::next`] would yield an entry. Does not consume it.
    fn more(&mut self) -> bool;
}

#[derive(Debug)]
enum Position {
    NotStarted,
    At(Arc<IndexCatalogEntry>),
    Exhausted,
}

impl Position {
    fn after(next: Option<Arc<IndexCatalogEntry>>) -> Self {
        next.map_or(Position::Exhausted, Position::At)
    }

    fn is_at_entry(&self) -> bool {
        matches!(self, Position::At(_))
    }
}

/// Ready indexes visible to the reading operation's snapshot
///
/// Borrows the live container; the caller's collection lock must outlive the
/// iterator.
pub struct ReadyIndexesIterator<'a> {
    recovery_unit: &'a dyn RecoveryUnit,
    entries: slice::Iter<'a, Arc<IndexCatalogEntry>>,
    position: Position,
}

impl<'a> ReadyIndexesIterator<'a> {
    pub fn new(
        recovery_unit: &'a dyn RecoveryUnit,
        entries: slice::Iter<'a, Arc<IndexCatalogEntry>>,
    ) -> Self {
        Self {
            recovery_unit,
            entries,
            position: Position::NotStarted,
        }
    }

    fn advance(&mut self) -> Option<Arc<IndexCatalogEntry>> {
        let recovery_unit = self.recovery_unit;
        self.entries
            .find(|entry| entry.is_visible_at(recovery_unit.point_in_time_read_timestamp()))
            .cloned()
    }
}

impl IndexIterator for ReadyIndexesIterator<'_> {
    fn more(&mut self) -> bool {
        if let Position::NotStarted = self.position {
            self.position = Position::after(self.advance());
        }
        self.position.is_at_entry()
    }
}

impl Iterator for ReadyIndexesIterator<'_> {
    type Item = Arc<IndexCatalogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.more() {
            return None;
        }
        let upcoming = Position::after(self.advance());
        match std::mem::replace(&mut self.position, upcoming) {
            Position::At(entry) => Some(entry),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ReadyIndexesIterator<'_> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ReadyIndexesIterator")
            .field("remaining", &self.entries.len())
            .field("position", &self.position)
            .finish()
    }
}

/// Every index, finished or not, from a detached list of entries
///
/// Owns its list, so concurrent changes to the catalog do not affect the walk.
#[derive(Debug)]
pub struct AllIndexesIterator {
    entries: vec::IntoIter<Arc<IndexCatalogEntry>>,
    position: Position,
}

impl AllIndexesIterator {
    pub fn new(entries: Vec<Arc<IndexCatalogEntry>>) -> Self {
        Self {
            entries: entries.into_iter(),
            position: Position::NotStarted,
        }
    }
}

impl IndexIterator for AllIndexesIterator {
    fn more(&mut self) -> bool {
        if let Position::NotStarted = self.position {
            self.position = Position::after(self.entries.next());
        }
        self.position.is_at_entry()
    }
}

impl Iterator for AllIndexesIterator {
    type Item = Arc<IndexCatalogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.more() {
            return None;
        }
        let upcoming = Position::after(self.entries.next());
        match std::mem::replace(&mut self.position, upcoming) {
            Position::At(entry) => Some(entry),
            _ => None,
        }
    }
}
