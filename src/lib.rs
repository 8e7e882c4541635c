//! Reqscope - transparent HTTP traffic capture engine
//!
//! Intercepts outbound calls through decorated request primitives and
//! publishes completed request/response records to an ordered capture
//! buffer, without altering what the caller observes.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod error;
pub mod intercept;
pub mod record;
pub mod session;
pub mod upstream;

pub use error::{ReqscopeError, Result};
