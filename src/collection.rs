//! Ordered, drag-reorderable list of file records.
//!
//! The order of the collection is the page order of the output document.
//! Every operation is total: unknown ids are treated as absent and turn the
//! call into a no-op rather than an error.

use crate::record::{FileId, FileRecord, RawFile};
use tracing::debug;

/// Ordered list of [`FileRecord`]s with no duplicate ids.
#[derive(Debug, Default, Clone)]
pub struct OrderedCollection {
    items: Vec<FileRecord>,
}

impl OrderedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap each raw file in a new record and append in input order.
    ///
    /// Returns the ids of the new records, in the same order. No type
    /// validation happens here.
    pub fn append<I>(&mut self, files: I) -> Vec<FileId>
    where
        I: IntoIterator<Item = RawFile>,
    {
        let start = self.items.len();
        self.items.extend(files.into_iter().map(FileRecord::new));
        let added: Vec<FileId> = self.items[start..].iter().map(FileRecord::id).collect();
        debug!("Appended {} records (total {})", added.len(), self.items.len());
        added
    }

    /// Remove the record with `id`. Returns the removed record, if any.
    pub fn remove(&mut self, id: FileId) -> Option<FileRecord> {
        let idx = self.position(id)?;
        Some(self.items.remove(idx))
    }

    /// Move the record `source` into the slot currently held by `target`.
    ///
    /// Array-move semantics: the source is taken out and reinserted at the
    /// target's index, shifting the records in between by one. Returns
    /// `false` (and leaves the order untouched) when the ids are equal or
    /// either one is absent.
    pub fn reorder(&mut self, source: FileId, target: FileId) -> bool {
        if source == target {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(source), self.position(target)) else {
            return false;
        };
        let moved = self.items.remove(from);
        self.items.insert(to, moved);
        debug!("Moved {} from {} to {}", source, from, to);
        true
    }

    /// Drop every record.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, id: FileId) -> Option<usize> {
        self.items.iter().position(|r| r.id() == id)
    }

    pub fn get(&self, id: FileId) -> Option<&FileRecord> {
        self.items.iter().find(|r| r.id() == id)
    }

    /// Id at a 0-based position.
    pub fn id_at(&self, index: usize) -> Option<FileId> {
        self.items.get(index).map(FileRecord::id)
    }

    pub fn ids(&self) -> Vec<FileId> {
        self.items.iter().map(FileRecord::id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.items.iter()
    }

    /// Copy of the current order, for an assembly run that must not observe
    /// later edits.
    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.items.clone()
    }
}
