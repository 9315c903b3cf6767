//! Compression Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzCompression, read::BzDecoder, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};
use tracing::instrument;

// Publishing a dataset happens once, downloading it happens on every
// revalidation. Squeeze as hard as possible.
const BZIP2_LEVEL: BzCompression = BzCompression::best();
const GZIP_LEVEL: GzCompression = GzCompression::best();

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// The engine itself never writes datasets; this exists for tooling and
    /// test fixtures that need to produce what a publisher would upload.
    ///
    /// # Examples
    ///
    /// ```
    /// use skilldex_compress::Compression;
    ///
    /// let compressed = Compression::Gzip.compress(b"SQLite format 3\0").unwrap();
    /// assert_eq!(Compression::from_magic_bytes(&compressed), Compression::Gzip);
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(&mut output, BZIP2_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, GZIP_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
        }
        Ok(output)
    }

    /// Decompress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use skilldex_compress::Compression;
    ///
    /// let original = b"SQLite format 3\0";
    /// let compressed = Compression::Bzip2.compress(original).unwrap();
    /// let decompressed = Compression::Bzip2.decompress(&compressed).unwrap();
    /// assert_eq!(decompressed, original);
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len(), output_size))]
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let size = match self {
            Compression::None => {
                output.extend_from_slice(input);
                input.len()
            },
            Compression::Bzip2 => BzDecoder::new(input).read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?,
            Compression::Gzip => GzDecoder::new(input).read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?,
        };
        tracing::Span::current().record("output_size", size);
        Ok(output)
    }

    /// Detect the format from the payload's magic bytes and decompress it.
    ///
    /// Uncompressed payloads are returned as-is without copying.
    pub fn unpack(input: Vec<u8>) -> Result<Vec<u8>> {
        match Self::from_magic_bytes(&input) {
            Compression::None => Ok(input),
            format => format.decompress(&input),
        }
    }
}
