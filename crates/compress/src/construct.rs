use crate::Compression;

const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

impl From<&[u8]> for Compression {
    fn from(value: &[u8]) -> Self {
        Compression::from_magic_bytes(value)
    }
}

impl Compression {
    /// Detect compression format from magic bytes.
    ///
    /// Returns the `None` variant if no magic bytes match or if the input is
    /// too short to detect any format. An SQLite file starts with the ASCII
    /// text `SQLite format 3`, which can never collide with either magic.
    ///
    /// There is deliberately no detection from file extensions: servers that
    /// apply `Content-Encoding: gzip` to `skills.db.gz` hand over the already
    /// decompressed bytes, and the name lies.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&BZIP2_MAGIC) {
            return Compression::Bzip2;
        }
        if bytes.starts_with(&GZIP_MAGIC) {
            return Compression::Gzip;
        }
        Compression::None
    }
}
