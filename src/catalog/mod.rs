//! Per-collection index catalog
//!
//! Tracks finished and in-progress index builds and exposes them through two
//! iterator flavours: [`ReadyIndexesIterator`] filters by the reader's
//! snapshot, [`AllIndexesIterator`] walks a detached copy of everything.
mod entry_container;
mod index_catalog;
mod index_entry;
mod iterator;
mod recovery_unit;
mod timestamp;

pub use entry_container::*;
pub use index_catalog::*;
pub use index_entry::*;
pub use iterator::*;
pub use recovery_unit::*;
pub use timestamp::*;
