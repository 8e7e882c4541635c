//! Capture session: record buffer, counters and notification hook

mod buffer;
mod session;

pub use buffer::CaptureBuffer;
pub use session::{CaptureSession, CaptureStats};
