//! Per-context capture session

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::config::CaptureConfig;
use crate::record::CapturedRequest;

use super::CaptureBuffer;

type NotificationHook = Arc<dyn Fn() + Send + Sync>;

/// Capture counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Records committed to the buffer
    pub captured: usize,
    /// Exchanges excluded by the status filter
    pub filtered: usize,
    /// Records abandoned on a body-decode failure
    pub dropped: usize,
}

/// One capture session per monitored context
///
/// Replaces the original's page-global installed flag and shared list:
/// the session is created explicitly and handed by reference to both
/// adapters, so independent sessions can coexist (one per test, say).
pub struct CaptureSession {
    buffer: CaptureBuffer,
    hook: Mutex<Option<NotificationHook>>,
    config: CaptureConfig,
    captured: AtomicUsize,
    filtered: AtomicUsize,
    dropped: AtomicUsize,
}

impl CaptureSession {
    /// Create a session with the given configuration
    #[must_use]
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            buffer: CaptureBuffer::new(config.max_records),
            hook: Mutex::new(None),
            config,
            captured: AtomicUsize::new(0),
            filtered: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Register the notification hook, replacing any previous one
    ///
    /// The hook runs after every successful commit. Its absence is not an
    /// error; consumers may poll `records` instead.
    pub fn set_notification_hook<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.lock_hook() = Some(Arc::new(hook));
    }

    /// Remove the notification hook
    pub fn clear_notification_hook(&self) {
        *self.lock_hook() = None;
    }

    /// Snapshot of captured records, in completion order
    #[must_use]
    pub fn records(&self) -> Vec<CapturedRequest> {
        self.buffer.snapshot()
    }

    /// Remove and return all captured records, in completion order
    ///
    /// Hand-off-and-clear export for long-lived sessions.
    #[must_use]
    pub fn drain(&self) -> Vec<CapturedRequest> {
        self.buffer.drain()
    }

    /// Number of retained records
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no records are retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Capture counters
    #[must_use]
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            captured: self.captured.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Commit a finalized record and fire the notification hook
    pub(crate) fn commit(&self, record: CapturedRequest) {
        debug!(
            "Captured: {} {} status {}",
            record.method, record.url, record.status
        );
        self.buffer.push(record);
        self.captured.fetch_add(1, Ordering::Relaxed);

        // Clone the hook out so a hook that re-registers itself cannot
        // deadlock against the registration lock.
        let hook = self.lock_hook().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Count an exchange excluded by the status filter
    pub(crate) fn note_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a record abandoned on a decode failure
    pub(crate) fn note_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn lock_hook(&self) -> std::sync::MutexGuard<'_, Option<NotificationHook>> {
        self.hook
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(CaptureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HeaderMap, Payload, RecordDraft, RequestKind};

    fn record(url: &str) -> CapturedRequest {
        RecordDraft::new(RequestKind::Xhr, "GET", url).finalize(
            0,
            200,
            "OK".to_string(),
            HeaderMap::new(),
            Payload::Text(String::new()),
            0,
        )
    }

    #[test]
    fn test_commit_appends_and_counts() {
        let session = CaptureSession::default();
        session.commit(record("http://example.com/a"));
        session.commit(record("http://example.com/b"));

        assert_eq!(session.len(), 2);
        assert_eq!(session.stats().captured, 2);
    }

    #[test]
    fn test_hook_fires_per_commit() {
        let session = CaptureSession::default();
        let count = Arc::new(AtomicUsize::new(0));

        let hook_count = Arc::clone(&count);
        session.set_notification_hook(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        });

        session.commit(record("http://example.com/a"));
        session.commit(record("http://example.com/b"));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_hook_is_not_an_error() {
        let session = CaptureSession::default();
        session.commit(record("http://example.com/a"));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_cleared_hook_stops_firing() {
        let session = CaptureSession::default();
        let count = Arc::new(AtomicUsize::new(0));

        let hook_count = Arc::clone(&count);
        session.set_notification_hook(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        });
        session.clear_notification_hook();

        session.commit(record("http://example.com/a"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drain_resets_buffer_not_counters() {
        let session = CaptureSession::default();
        session.commit(record("http://example.com/a"));

        let drained = session.drain();
        assert_eq!(drained.len(), 1);
        assert!(session.is_empty());
        assert_eq!(session.stats().captured, 1);
    }

    #[test]
    fn test_bounded_session_evicts() {
        let config = CaptureConfig {
            max_records: Some(1),
            max_payload_bytes: None,
        };
        let session = CaptureSession::new(config);
        session.commit(record("http://example.com/a"));
        session.commit(record("http://example.com/b"));

        let records = session.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "http://example.com/b");
        assert_eq!(session.stats().captured, 2);
    }
}
