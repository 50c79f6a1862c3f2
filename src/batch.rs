use serde::Serialize;

use crate::record::Record;

/// An ordered, bounded accumulation of records forming one atomic write
/// unit. Success or failure of a write applies to the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    records: Vec<Record>,
    capacity: usize,
}

impl Batch {
    /// Create an empty batch with the given capacity (the chunk size).
    /// Batches are assembled by the engine only; external collaborators
    /// receive them read-only.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, record: Record) {
        debug_assert!(self.records.len() < self.capacity);
        self.records.push(record);
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Drain the batch into a fresh empty one with the same capacity,
    /// returning the filled batch for writing.
    pub(crate) fn take(&mut self) -> Batch {
        let full = Batch {
            records: std::mem::take(&mut self.records),
            capacity: self.capacity,
        };
        self.records.reserve(self.capacity);
        full
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
