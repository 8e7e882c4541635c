//! Recording decorator for the stateful open/send request primitive

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::record::{unix_millis, HeaderMap, Payload, RecordDraft, RequestKind};
use crate::session::CaptureSession;

use super::is_captured_status;

/// Response type declared on an XHR-style instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XhrResponseType {
    /// Plain text, including the empty default declaration
    #[default]
    Text,
    /// JSON, parsed before the record is committed
    Json,
    /// Anything else; the body is never decoded
    Binary,
}

/// Terminal-state snapshot of an XHR-style exchange
#[derive(Debug, Clone)]
pub struct XhrOutcome {
    /// HTTP status code; `0` for aborted or failed exchanges
    pub status: u16,
    /// HTTP reason phrase
    pub status_text: String,
    /// Raw header blob: `Name: Value` lines separated by CRLF or LF
    pub raw_headers: String,
    /// Response type declared on the instance
    pub response_type: XhrResponseType,
    /// Raw response body
    pub body: Bytes,
}

/// The stateful open/send request primitive
///
/// `send` drives the exchange to its terminal state; the returned future
/// resolves only once no further state changes will occur.
pub trait XhrPrimitive: Send {
    /// Prepare the exchange with a method and URL
    fn open(&mut self, method: &str, url: &str);

    /// Send the request and resolve with the terminal-state snapshot
    fn send(&mut self, body: Option<Bytes>) -> BoxFuture<'_, XhrOutcome>;
}

/// Creates fresh request instances, one per exchange
pub trait XhrFactory: Send + Sync {
    /// Create an unopened instance
    fn create(&self) -> Box<dyn XhrPrimitive>;
}

/// Decorator that records successful exchanges through an inner instance
///
/// The draft lives on the recorder instance itself, so concurrent
/// instances never share state. The terminal snapshot is handed back to
/// the caller unmodified.
pub struct XhrRecorder {
    inner: Box<dyn XhrPrimitive>,
    session: Arc<CaptureSession>,
    draft: Option<RecordDraft>,
}

impl XhrRecorder {
    /// Wrap an instance, recording into the given session
    #[must_use]
    pub fn new(inner: Box<dyn XhrPrimitive>, session: Arc<CaptureSession>) -> Self {
        Self {
            inner,
            session,
            draft: None,
        }
    }

    /// Finalize and commit a record from the terminal snapshot
    fn finalize(&self, draft: RecordDraft, outcome: &XhrOutcome) {
        let end_time = unix_millis();

        if outcome.status == 0 || !is_captured_status(outcome.status) {
            debug!(
                "Skipped failed exchange: {} {} status {}",
                draft.method(),
                draft.url(),
                outcome.status
            );
            self.session.note_filtered();
            return;
        }

        // Best effort: malformed lines are skipped and the record proceeds
        // with whatever parsed, possibly nothing.
        let response_headers = parse_header_blob(&outcome.raw_headers);

        if let Some(cap) = self.session.config().max_payload_bytes {
            if outcome.body.len() > cap {
                let reason = format!("body of {} bytes exceeds capture limit", outcome.body.len());
                self.commit(draft, end_time, outcome, response_headers, Payload::Omitted(reason), 0);
                return;
            }
        }

        let (payload, size) = match outcome.response_type {
            XhrResponseType::Text => match std::str::from_utf8(&outcome.body) {
                Ok(text) => (Payload::Text(text.to_string()), text.len()),
                Err(e) => {
                    warn!(
                        "Failed to read response for {} {}: {e}",
                        draft.method(),
                        draft.url()
                    );
                    self.session.note_dropped();
                    return;
                }
            },
            XhrResponseType::Json => {
                match serde_json::from_slice::<serde_json::Value>(&outcome.body) {
                    Ok(value) => {
                        let size = serde_json::to_string(&value).map_or(0, |s| s.len());
                        (Payload::Json(value), size)
                    }
                    Err(e) => {
                        warn!(
                            "Failed to parse JSON response for {} {}: {e}",
                            draft.method(),
                            draft.url()
                        );
                        self.session.note_dropped();
                        return;
                    }
                }
            }
            XhrResponseType::Binary => (Payload::Binary(outcome.body.len()), 0),
        };

        self.commit(draft, end_time, outcome, response_headers, payload, size);
    }

    fn commit(
        &self,
        draft: RecordDraft,
        end_time: u64,
        outcome: &XhrOutcome,
        response_headers: HeaderMap,
        payload: Payload,
        size: usize,
    ) {
        let record = draft.finalize(
            end_time,
            outcome.status,
            outcome.status_text.clone(),
            response_headers,
            payload,
            size,
        );
        self.session.commit(record);
    }
}

impl XhrPrimitive for XhrRecorder {
    fn open(&mut self, method: &str, url: &str) {
        self.draft = Some(RecordDraft::new(RequestKind::Xhr, method, url));
        self.inner.open(method, url);
    }

    fn send(&mut self, body: Option<Bytes>) -> BoxFuture<'_, XhrOutcome> {
        Box::pin(async move {
            if let Some(draft) = self.draft.as_mut() {
                draft.set_request_body(body.clone());
            }

            let outcome = self.inner.send(body).await;

            // Terminal state reached; a send without a prior open has no
            // draft and records nothing.
            if let Some(draft) = self.draft.take() {
                self.finalize(draft, &outcome);
            }

            outcome
        })
    }
}

/// Parse a raw header blob into a mapping
///
/// Lines without a `": "` separator are skipped with a warning; a fully
/// malformed blob yields an empty mapping.
#[must_use]
pub fn parse_header_blob(raw: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in raw.lines() {
        if line.is_empty() {
            continue;
        }
        match line.split_once(": ") {
            Some((name, value)) => {
                headers.insert(name.to_string(), value.to_string());
            }
            None => warn!("Malformed response header line: {line:?}"),
        }
    }
    headers
}
