//! Recording decorator for the future-returning request primitive

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::record::{unix_millis, HeaderMap, Payload, RecordDraft, RequestKind};
use crate::session::CaptureSession;
use crate::Result;

use super::is_captured_status;

/// Request handed to the fetch primitive
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Target URL
    pub url: String,
    /// HTTP method; `None` defaults to GET
    pub method: Option<String>,
    /// Caller-supplied request headers
    pub headers: Vec<(String, String)>,
    /// Caller-supplied request body
    pub body: Option<Bytes>,
}

impl FetchRequest {
    /// A GET request with no headers or body
    #[must_use]
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: None,
            headers: Vec::new(),
            body: None,
        }
    }
}

/// Response produced by the fetch primitive
///
/// The body is `Bytes`, so observing it means cloning a handle, never
/// consuming the caller's view.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// HTTP reason phrase
    pub status_text: String,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
}

impl FetchResponse {
    /// Declared content type, if any
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

/// The future-returning request primitive
pub trait FetchPrimitive: Send + Sync {
    /// Issue a request, resolving with the response or a transport failure
    fn call(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse>>;
}

/// Decorator that records successful exchanges through an inner primitive
///
/// The caller always receives exactly what the inner primitive produced:
/// the same response on fulfillment, the same error on rejection.
pub struct FetchRecorder {
    inner: Arc<dyn FetchPrimitive>,
    session: Arc<CaptureSession>,
}

impl FetchRecorder {
    /// Wrap a primitive, recording into the given session
    #[must_use]
    pub fn new(inner: Arc<dyn FetchPrimitive>, session: Arc<CaptureSession>) -> Self {
        Self { inner, session }
    }

    /// Observe a fulfilled response and commit a record if it qualifies
    fn observe(&self, draft: RecordDraft, response: &FetchResponse) {
        let end_time = unix_millis();

        if !is_captured_status(response.status) {
            debug!(
                "Skipped failed exchange: {} {} status {}",
                draft.method(),
                draft.url(),
                response.status
            );
            self.session.note_filtered();
            return;
        }

        let response_headers: HeaderMap = response.headers.iter().cloned().collect();

        // Duplicate handle; the caller's body is untouched.
        let body = response.body.clone();

        if let Some(cap) = self.session.config().max_payload_bytes {
            if body.len() > cap {
                let reason = format!("body of {} bytes exceeds capture limit", body.len());
                self.commit(draft, end_time, response, response_headers, Payload::Omitted(reason), 0);
                return;
            }
        }

        let (payload, size) = match response.content_type() {
            Some(ct) if ct.contains("application/json") => {
                match serde_json::from_slice::<serde_json::Value>(&body) {
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
            Some(ct) if ct.starts_with("text/") => match std::str::from_utf8(&body) {
                Ok(text) => (Payload::Text(text.to_string()), text.len()),
                Err(e) => {
                    warn!(
                        "Failed to read text response for {} {}: {e}",
                        draft.method(),
                        draft.url()
                    );
                    self.session.note_dropped();
                    return;
                }
            },
            Some(_) => (Payload::Binary(body.len()), 0),
            None => (
                Payload::Omitted("no content-type header".to_string()),
                0,
            ),
        };

        self.commit(draft, end_time, response, response_headers, payload, size);
    }

    fn commit(
        &self,
        draft: RecordDraft,
        end_time: u64,
        response: &FetchResponse,
        response_headers: HeaderMap,
        payload: Payload,
        size: usize,
    ) {
        let record = draft.finalize(
            end_time,
            response.status,
            response.status_text.clone(),
            response_headers,
            payload,
            size,
        );
        self.session.commit(record);
    }
}

impl FetchPrimitive for FetchRecorder {
    fn call(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse>> {
        Box::pin(async move {
            let method = request.method.clone().unwrap_or_else(|| "GET".to_string());
            let mut draft = RecordDraft::new(RequestKind::Fetch, &method, &request.url);
            draft.set_request_headers(request.headers.iter().cloned());
            draft.set_request_body(request.body.clone());

            match self.inner.call(request).await {
                Ok(response) => {
                    self.observe(draft, &response);
                    Ok(response)
                }
                Err(err) => {
                    // End-time bookkeeping only; the rejection is re-thrown
                    // unchanged and never recorded.
                    debug!(
                        "Skipped network error: {} {} after {}ms: {err}",
                        draft.method(),
                        draft.url(),
                        draft.elapsed_millis()
                    );
                    Err(err)
                }
            }
        })
    }
}
