//! Error types for Reqscope

use std::io;
use thiserror::Error;

/// Result type for Reqscope operations
pub type Result<T> = std::result::Result<T, ReqscopeError>;

/// Errors that can occur in Reqscope
///
/// Capture-side trouble (filtered exchanges, decode failures, header parse
/// failures) is contained inside the adapters and never surfaces here; the
/// only error a caller sees from a decorated primitive is the one the inner
/// primitive itself produced.
#[derive(Debug, Error)]
pub enum ReqscopeError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request handed to an upstream primitive
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream network failure; propagated to the caller, never recorded
    #[error("Upstream transport error: {0}")]
    Transport(String),
}
