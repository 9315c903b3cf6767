//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Unlike the other crates, [`ErrorKind`] here is `Clone`: the outcome of a
//! single-flight load is handed to every caller waiting on it, so the kind
//! has to be copyable. The full error tree is logged where the load fails.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum ErrorKind {
    /// The dataset has no user table to query.
    #[display("no table found in dataset")]
    NoTableFound,
    /// The bytes are not a (possibly compressed) SQLite database.
    #[display("dataset is not a valid database")]
    ParseError,
    /// Fetching the dataset from its source failed.
    #[display("dataset source failed: {message}")]
    Source { message: String, retryable: bool },
    #[display("database error")]
    Database,
    /// Materializing the dataset to its temporary file failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source { retryable, .. } => *retryable,
            Self::Io => true,
            // Same bytes, same result.
            Self::NoTableFound | Self::ParseError | Self::Database => false,
        }
    }
}
