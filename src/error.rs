//! Unified error categories: one `ErrorCode` per failure class, mapped to an
//! HTTP status in one place instead of scattering status codes through
//! handlers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure categories surfaced by the Muxer Adapter (SPEC_FULL.md §4.2) and
/// the HTTP event-ingestion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The named window/session does not exist (not itself an error for
    /// idempotent operations like `killWindow`).
    NotFound,
    /// A transient failure from the muxer CLI or an external I/O call —
    /// safe to retry, and for in-session windows treated as a crash.
    Transient,
    /// An unrecognized muxer failure (non-zero exit with an unknown reason).
    Unknown,
    /// Request failed an authorization check.
    Unauthorized,
    /// Malformed request body or unsupported command.
    BadRequest,
    /// `maxConcurrent` sessions already running.
    LimitReached,
    /// Anything else.
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Transient => 503,
            Self::Unknown => 502,
            Self::Unauthorized => 401,
            Self::BadRequest => 400,
            Self::LimitReached => 429,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Transient => "TRANSIENT",
            Self::Unknown => "UNKNOWN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::LimitReached => "LIMIT_REACHED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised by the Muxer Adapter (SPEC_FULL.md §4.2): "All errors
/// surface as `AdapterError` with a category."
#[derive(Debug)]
pub struct AdapterError {
    pub code: ErrorCode,
    pub message: String,
}

impl AdapterError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transient, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AdapterError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
