//! Where finished records go

use std::sync::{Mutex, PoisonError};

use crate::Property;

/// Append-only destination for finished records
///
/// `append` is called concurrently by every processor task and never fails.
pub trait RecordSink: Send + Sync {
    fn append(&self, record: Property);
}

/// In-memory sink drained once at the end of a run
///
/// Appends are serialized by a mutex; records come out in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Property>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every record, in arrival order
    pub fn drain(&self) -> Vec<Property> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Take every record, ordered by source URL
    ///
    /// Arrival order depends on scheduling, this one does not.
    pub fn drain_sorted(&self) -> Vec<Property> {
        let mut records = self.drain();
        records.sort_by(|a, b| a.source_url.cmp(&b.source_url));
        records
    }
}

impl RecordSink for MemorySink {
    fn append(&self, record: Property) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}
