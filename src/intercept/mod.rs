//! Interception layer: primitive traits, recording decorators, installer
//!
//! Each decorator implements the same call contract as the primitive it
//! wraps, so composition at install time is invisible to callers.

mod context;
mod fetch;
mod xhr;

pub use context::NetworkContext;
pub use fetch::{FetchPrimitive, FetchRecorder, FetchRequest, FetchResponse};
pub use xhr::{
    parse_header_blob, XhrFactory, XhrOutcome, XhrPrimitive, XhrRecorder, XhrResponseType,
};

/// Lowest terminal status that produces a record (inclusive)
pub const CAPTURE_STATUS_MIN: u16 = 200;

/// Lowest terminal status excluded from capture (exclusive upper bound)
pub const CAPTURE_STATUS_LIMIT: u16 = 400;

/// Whether a terminal status falls inside the captured window
///
/// Status `0` (aborted/opaque exchanges) falls below the window and is
/// never captured.
#[must_use]
pub fn is_captured_status(status: u16) -> bool {
    (CAPTURE_STATUS_MIN..CAPTURE_STATUS_LIMIT).contains(&status)
}
