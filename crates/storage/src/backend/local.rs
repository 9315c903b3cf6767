//! Local filesystem source backend.
//!
//! Reads the dataset file with `tokio::fs`. Staleness is detected purely by
//! modification time: if the mtime matches what was recorded on the last
//! load, the file is not even opened.

use crate::backend::SourceBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{Fetch, Validators};
use crate::source::DataSource;
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tracing::instrument;

/// Local filesystem source backend.
///
/// # Examples
///
/// ```no_run
/// use skilldex_storage::backend::{LocalBackend, SourceBackend};
/// use skilldex_storage::Validators;
///
/// # async fn example() -> skilldex_storage::error::Result<()> {
/// let backend = LocalBackend::new("data/skills.db");
/// let fetched = backend.fetch(&Validators::default()).await?;
/// assert!(fetched.is_modified());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    source: DataSource,
    path: PathBuf,
}
impl LocalBackend {
    /// Create a backend for the dataset file at `path`.
    ///
    /// Relative paths are resolved against the working directory at fetch
    /// time, same as every other tool. The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            source: DataSource::local(&path),
            path,
        }
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorKind::SourceUnavailable(path.to_path_buf())
            },
            _ => ErrorKind::Io(e),
        }
    }

    fn mtime_ms(metadata: &Metadata) -> Result<i64> {
        let modified: OffsetDateTime = metadata.modified().map_err(ErrorKind::Io)?.into();
        // Millisecond precision is plenty; truncation keeps it in range of i64
        // for the next 290 million years.
        Ok((modified.unix_timestamp_nanos() / 1_000_000) as i64)
    }
}

#[async_trait]
impl SourceBackend for LocalBackend {
    fn source(&self) -> &DataSource {
        &self.source
    }

    #[instrument(skip(self, cached), fields(path = %self.path.display()))]
    async fn fetch(&self, cached: &Validators) -> Result<Fetch> {
        let metadata = fs::metadata(&self.path).await.map_err(|e| Self::map_io_error(e, &self.path))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::SourceUnavailable(self.path.clone()));
        }
        let mtime_ms = Self::mtime_ms(&metadata)?;
        if cached.mtime_ms == Some(mtime_ms) {
            tracing::debug!(mtime_ms, "dataset file unchanged");
            return Ok(Fetch::NotModified(cached.clone()));
        }
        let bytes = fs::read(&self.path).await.map_err(|e| Self::map_io_error(e, &self.path))?;
        tracing::debug!(mtime_ms, bytes = bytes.len(), "read dataset file");
        Ok(Fetch::Modified {
            bytes,
            validators: Validators::from_mtime(mtime_ms),
        })
    }
}
