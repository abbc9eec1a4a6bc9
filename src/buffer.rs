//! Bounded, newest-first history of finalized change records.

use crate::types::ChangeRecord;
use std::collections::VecDeque;

/// Default number of records retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Largest capacity accepted from configuration.
pub const MAX_HISTORY_CAPACITY: usize = 100_000;

/// Most recent records, newest at index 0.
///
/// Pushing beyond capacity evicts the oldest record. A capacity of zero
/// retains nothing. No internal locking: the hub is the only writer.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    records: VecDeque<ChangeRecord>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            // Grows on demand past the default.
            records: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
        }
    }

    /// Insert at the front, evicting from the back past capacity.
    pub fn push(&mut self, record: ChangeRecord) {
        self.records.push_front(record);
        while self.records.len() > self.capacity {
            self.records.pop_back();
        }
    }

    /// Copy of the contents, newest first.
    pub fn snapshot(&self) -> Vec<ChangeRecord> {
        self.records.iter().cloned().collect()
    }

    /// Newest record.
    pub fn front(&self) -> Option<&ChangeRecord> {
        self.records.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
