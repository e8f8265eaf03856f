//! Shared utilities for hubbridge.
//!
//! This crate provides common utilities used across the hubbridge workspace:
//! - Logging setup with tracing
//! - Redaction of secrets before they reach logs or terminal output

pub mod log;
pub mod redact;

pub use log::{LogConfig, LogLevel};
pub use redact::{redact_headers, redact_value};
