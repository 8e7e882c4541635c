//! Capture data model: completed records and in-flight drafts

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Serialize;

/// Which request primitive produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// The stateful open/send primitive
    Xhr,
    /// The future-returning primitive
    Fetch,
}

impl RequestKind {
    /// Short lowercase name, used as the id prefix
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Xhr => "xhr",
            RequestKind::Fetch => "fetch",
        }
    }
}

/// Decoded response payload
///
/// An explicit tagged variant per decode path, so consumers dispatch
/// exhaustively instead of pattern-matching on sentinel strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Payload {
    /// Raw text body
    Text(String),
    /// Parsed JSON body
    Json(serde_json::Value),
    /// Undecoded body of the given byte length
    Binary(usize),
    /// Body deliberately not stored, with the reason
    Omitted(String),
}

/// Header mapping for requests and responses
///
/// Duplicate names collapse to the last value seen.
pub type HeaderMap = BTreeMap<String, String>;

/// The immutable record of one completed, successful exchange
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    /// Opaque unique identifier generated at initiation time
    pub id: String,
    /// Originating primitive
    #[serde(rename = "type")]
    pub kind: RequestKind,
    /// HTTP method as supplied by the caller (uppercased)
    pub method: String,
    /// URL as supplied by the caller
    pub url: String,
    /// Initiation time, unix milliseconds
    pub start_time: u64,
    /// Terminal-state time, unix milliseconds
    pub end_time: u64,
    /// `end_time - start_time`, milliseconds
    pub duration: u64,
    /// Caller-supplied request headers (empty on the XHR path)
    pub request_headers: HeaderMap,
    /// Caller-supplied request body, stored unparsed
    pub request_body: Option<Bytes>,
    /// Response headers at the terminal state
    pub response_headers: HeaderMap,
    /// HTTP status code
    pub status: u16,
    /// HTTP reason phrase
    pub status_text: String,
    /// Decoded response payload
    pub response: Payload,
    /// Length of the decoded payload, `0` for binary/omitted
    pub response_size: usize,
}

/// Provisional record owned by a single adapter invocation
///
/// Request-identifying fields are fixed at construction and cannot be
/// changed afterwards; `finalize` consumes the draft, so response fields
/// are fixed exactly once.
#[derive(Debug)]
pub struct RecordDraft {
    id: String,
    kind: RequestKind,
    method: String,
    url: String,
    start_time: u64,
    request_headers: HeaderMap,
    request_body: Option<Bytes>,
}

impl RecordDraft {
    /// Create a draft at initiation time
    #[must_use]
    pub fn new(kind: RequestKind, method: &str, url: &str) -> Self {
        Self {
            id: generate_id(kind),
            kind,
            method: method.to_uppercase(),
            url: url.to_string(),
            start_time: unix_millis(),
            request_headers: HeaderMap::new(),
            request_body: None,
        }
    }

    /// Copy caller-supplied request headers into the draft
    pub fn set_request_headers<I>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.request_headers = headers.into_iter().collect();
    }

    /// Store the caller-supplied request body, unparsed
    pub fn set_request_body(&mut self, body: Option<Bytes>) {
        self.request_body = body;
    }

    /// Draft id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// HTTP method fixed at initiation
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// URL fixed at initiation
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Initiation time, unix milliseconds
    #[must_use]
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Milliseconds elapsed since initiation, for bookkeeping logs
    #[must_use]
    pub fn elapsed_millis(&self) -> u64 {
        unix_millis().saturating_sub(self.start_time)
    }

    /// Consume the draft into an immutable record
    #[must_use]
    pub fn finalize(
        self,
        end_time: u64,
        status: u16,
        status_text: String,
        response_headers: HeaderMap,
        response: Payload,
        response_size: usize,
    ) -> CapturedRequest {
        CapturedRequest {
            id: self.id,
            kind: self.kind,
            method: self.method,
            url: self.url,
            start_time: self.start_time,
            end_time,
            duration: end_time.saturating_sub(self.start_time),
            request_headers: self.request_headers,
            request_body: self.request_body,
            response_headers,
            status,
            status_text,
            response,
            response_size,
        }
    }
}

/// Generate a record id of the form `<kind>_<millis>_<rand64-hex>`
///
/// Uniqueness comes from construction (wall clock plus 64 bits of
/// randomness); ids are never checked against prior ids.
#[must_use]
pub fn generate_id(kind: RequestKind) -> String {
    let entropy: u64 = rand::random();
    format!("{}_{}_{entropy:016x}", kind.as_str(), unix_millis())
}

/// Current wall-clock time in unix milliseconds
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
