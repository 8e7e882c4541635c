//! Append-only, completion-ordered record buffer

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::record::CapturedRequest;

/// Ordered sequence of completed records
///
/// Append-only: records are never reordered after insertion. Order is
/// completion order, not initiation order. With a capacity set, an append
/// beyond capacity evicts the oldest record from the front.
pub struct CaptureBuffer {
    records: Mutex<VecDeque<CapturedRequest>>,
    capacity: Option<usize>,
}

impl CaptureBuffer {
    /// Create a buffer, optionally bounded
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Append a completed record
    pub fn push(&self, record: CapturedRequest) {
        let mut records = self.lock();
        if let Some(capacity) = self.capacity {
            while records.len() >= capacity {
                records.pop_front();
            }
        }
        records.push_back(record);
    }

    /// Snapshot of all records, in completion order
    #[must_use]
    pub fn snapshot(&self) -> Vec<CapturedRequest> {
        self.lock().iter().cloned().collect()
    }

    /// Remove and return all records, in completion order
    #[must_use]
    pub fn drain(&self) -> Vec<CapturedRequest> {
        self.lock().drain(..).collect()
    }

    /// Number of retained records
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the buffer holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<CapturedRequest>> {
        // A poisoned lock only means a panicking test thread; the data is
        // still a well-formed queue.
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
