//! Compressed dataset payload detection and decompression.
//!
//! Dataset publishers like to ship `skills.db.gz` instead of `skills.db`, and
//! some CDNs will happily hand you the raw gzip stream without a
//! `Content-Encoding` header. This crate figures out whether a payload is
//! compressed from the magic bytes at the start of the buffer
//! ([`Compression::from_magic_bytes`]) and unpacks it in memory
//! ([`Compression::decompress`], or [`Compression::unpack`] to do both in one go).
//!
//! Only Bzip2 and Gzip are supported. The whole dataset is assumed to fit in
//! memory anyway, so there is no streaming API.

mod construct;
pub mod error;
mod ops;

/// A supported compression format.
///
/// Defaults to [`None`](Self::None) (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// Gzip compression (.gz)
    Gzip,
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Compression {
    /// Returns the short name (for logging and displaying to user).
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
        }
    }
}
