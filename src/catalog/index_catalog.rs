use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::AllIndexesIterator;
use super::IndexCatalogEntry;
use super::IndexCatalogEntryContainer;
use super::IndexDescriptor;
use super::IndexIterator;
use super::KeyPattern;
use super::ReadyIndexesIterator;
use super::RecoveryUnit;
use super::Timestamp;
use crate::CatalogError;
use crate::Result;

/// Indexes of one collection, split into finished and in-progress builds
///
/// Performs no locking of its own. Readers share it under the collection lock
/// and writers take it exclusively, which the `&self` / `&mut self` split
/// enforces.
#[derive(Debug, Default)]
pub struct IndexCatalog {
    ready: IndexCatalogEntryContainer,
    building: IndexCatalogEntryContainer,
}

impl IndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding a ready `_id_` index visible at every snapshot
    pub fn with_id_index() -> Self {
        let mut catalog = Self::new();
        let entry = Arc::new(IndexCatalogEntry::new(IndexDescriptor::id_index()));
        entry.set_ready();
        catalog.ready.add(entry);
        catalog
    }

    /// Iterates the ready indexes visible to `recovery_unit`, or every index
    /// including unfinished builds when `include_unfinished` is set.
    ///
    /// The unfinished walk works on a detached copy and ignores the read
    /// timestamp.
    pub fn get_index_iterator<'a>(
        &'a self,
        recovery_unit: &'a dyn RecoveryUnit,
        include_unfinished: bool,
    ) -> Box<dyn IndexIterator + 'a> {
        if !include_unfinished {
            return Box::new(ReadyIndexesIterator::new(recovery_unit, self.ready.iter()));
        }

        let mut all = self.ready.snapshot();
        all.extend(self.building.snapshot());
        Box::new(AllIndexesIterator::new(all))
    }

    /// Registers an index build. The entry stays invisible to ready-only
    /// iteration until [`commit_index_build`](Self::commit_index_build).
    pub fn prepare_index_build(
        &mut self,
        descriptor: IndexDescriptor,
    ) -> Result<Arc<IndexCatalogEntry>> {
        if self.ready.find(&descriptor.name).is_some() {
            return Err(CatalogError::IndexAlreadyExists(descriptor.name).into());
        }
        if self.building.find(&descriptor.name).is_some() {
            return Err(CatalogError::IndexBuildAlreadyInProgress(descriptor.name).into());
        }

        debug!(index = %descriptor.name, key = %descriptor.key_pattern, "Preparing index build");
        let entry = Arc::new(IndexCatalogEntry::new(descriptor));
        self.building.add(entry.clone());
        Ok(entry)
    }

    /// Marks the build of `name` finished.
    ///
    /// With a `commit_ts`, readers at earlier timestamps keep not seeing the
    /// index.
    pub fn commit_index_build(
        &mut self,
        name: &str,
        commit_ts: Option<Timestamp>,
    ) -> Result<Arc<IndexCatalogEntry>> {
        let entry = self
            .building
            .release(name)
            .ok_or_else(|| CatalogError::IndexBuildNotFound(name.to_string()))?;

        if let Some(ts) = commit_ts {
            entry.set_minimum_visible_snapshot(ts);
        }
        entry.set_ready();
        self.ready.add(entry.clone());

        info!(index = name, commit_ts = ?commit_ts, "Index build committed");
        Ok(entry)
    }

    pub fn abort_index_build(
        &mut self,
        name: &str,
    ) -> Result<Arc<IndexCatalogEntry>> {
        let entry = self
            .building
            .release(name)
            .ok_or_else(|| CatalogError::IndexBuildNotFound(name.to_string()))?;
        info!(index = name, "Index build aborted");
        Ok(entry)
    }

    /// Removes a ready index. The `_id_` index cannot be dropped.
    pub fn drop_index(
        &mut self,
        name: &str,
    ) -> Result<Arc<IndexCatalogEntry>> {
        let entry = self
            .ready
            .find(name)
            .ok_or_else(|| CatalogError::IndexNotFound(name.to_string()))?;
        if entry.descriptor().is_id_index() {
            return Err(CatalogError::CannotDropIdIndex.into());
        }

        let entry = self
            .ready
            .release(name)
            .ok_or_else(|| CatalogError::IndexNotFound(name.to_string()))?;
        info!(index = name, "Index dropped");
        Ok(entry)
    }

    pub fn find_index_by_name(
        &self,
        recovery_unit: &dyn RecoveryUnit,
        name: &str,
        include_unfinished: bool,
    ) -> Option<Arc<IndexCatalogEntry>> {
        self.get_index_iterator(recovery_unit, include_unfinished)
            .find(|entry| entry.name() == name)
    }

    pub fn find_index_by_key_pattern(
        &self,
        recovery_unit: &dyn RecoveryUnit,
        key_pattern: &KeyPattern,
        include_unfinished: bool,
    ) -> Option<Arc<IndexCatalogEntry>> {
        self.get_index_iterator(recovery_unit, include_unfinished)
            .find(|entry| entry.descriptor().key_pattern == *key_pattern)
    }

    pub fn num_indexes_total(&self) -> usize {
        self.ready.len() + self.building.len()
    }

    pub fn num_indexes_ready(&self) -> usize {
        self.ready.len()
    }

    pub fn num_indexes_in_progress(&self) -> usize {
        self.building.len()
    }

    pub fn have_any_indexes_in_progress(&self) -> bool {
        !self.building.is_empty()
    }
}
