use std::slice;
use std::sync::Arc;

use super::IndexCatalogEntry;

/// Insertion-ordered set of index entries
#[derive(Debug, Default)]
pub struct IndexCatalogEntryContainer {
    entries: Vec<Arc<IndexCatalogEntry>>,
}

impl IndexCatalogEntryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        entry: Arc<IndexCatalogEntry>,
    ) {
        self.entries.push(entry);
    }

    /// Removes and returns the entry named `name`, preserving the order of the rest.
    pub fn release(
        &mut self,
        name: &str,
    ) -> Option<Arc<IndexCatalogEntry>> {
        let pos = self.entries.iter().position(|e| e.name() == name)?;
        Some(self.entries.remove(pos))
    }

    pub fn find(
        &self,
        name: &str,
    ) -> Option<&Arc<IndexCatalogEntry>> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn iter(&self) -> slice::Iter<'_, Arc<IndexCatalogEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Detached copy of the entry handles, unaffected by later mutation of the container
    pub fn snapshot(&self) -> Vec<Arc<IndexCatalogEntry>> {
        self.entries.clone()
    }
}

impl<'a> IntoIterator for &'a IndexCatalogEntryContainer {
    type Item = &'a Arc<IndexCatalogEntry>;
    type IntoIter = slice::Iter<'a, Arc<IndexCatalogEntry>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
