//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Local dataset file is missing or unreadable.
    #[display("dataset source unavailable: {}", _0.display())]
    SourceUnavailable(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Remote server answered with a terminal non-success status.
    #[display("remote fetch failed with status {_0}")]
    FetchFailed(#[error(not(source))] u16),
    /// Connection, TLS or timeout failure talking to the remote host.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The configured source cannot be turned into a backend.
    #[display("invalid dataset source: {_0}")]
    InvalidSource(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Network(_) => true,
            // 5xx is the server having a bad day, 4xx is us (or the URL) being wrong.
            Self::FetchFailed(status) => *status >= 500,
            Self::SourceUnavailable(_) | Self::InvalidSource(_) => false,
        }
    }
}
