//! In-memory source backend for testing.

use crate::backend::SourceBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{Fetch, Validators};
use crate::source::DataSource;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MockState {
    /// Current "remote" content and the ETag it is served with.
    payload: Option<(String, Vec<u8>)>,
    failing: bool,
}

/// In-memory source backend for testing.
///
/// Behaves like a well-behaved HTTP host: content is served with an ETag, and
/// a fetch carrying the current ETag comes back as [`Fetch::NotModified`].
/// Every call to [`fetch`](SourceBackend::fetch) is counted, so tests can
/// assert how many revalidations actually reached the source.
///
/// # Examples
///
/// ```
/// use skilldex_storage::backend::{MockBackend, SourceBackend};
/// use skilldex_storage::Validators;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default().with_payload("\"v1\"", b"SQLite format 3\0".to_vec());
/// let fetched = backend.fetch(&Validators::default()).await?;
/// assert!(fetched.is_modified());
/// assert_eq!(backend.fetches(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockBackend {
    source: DataSource,
    state: Mutex<MockState>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl MockBackend {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            state: Mutex::new(MockState::default()),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_payload(self, etag: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            state: Mutex::new(MockState {
                payload: Some((etag.into(), bytes.into())),
                failing: false,
            }),
            ..self
        }
    }

    /// Make every fetch take at least `delay`, to widen race windows.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    /// Replace the served content, as if the dataset was republished.
    pub async fn set_payload(&self, etag: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.state.lock().await.payload = Some((etag.into(), bytes.into()));
    }

    /// Make subsequent fetches fail with a network error (or stop failing).
    pub async fn set_failing(&self, failing: bool) {
        self.state.lock().await.failing = failing;
    }

    /// Number of fetches that reached this backend so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(DataSource::local(PathBuf::from("mock/skills.db")))
    }
}

#[async_trait]
impl SourceBackend for MockBackend {
    fn source(&self) -> &DataSource {
        &self.source
    }

    async fn fetch(&self, cached: &Validators) -> Result<Fetch> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().await;
        if state.failing {
            exn::bail!(ErrorKind::Network("mock backend set to fail".to_string()));
        }
        let Some((etag, bytes)) = &state.payload else {
            exn::bail!(ErrorKind::SourceUnavailable(PathBuf::from(self.source.key())));
        };
        if cached.etag.as_deref() == Some(etag.as_str()) {
            return Ok(Fetch::NotModified(cached.clone()));
        }
        Ok(Fetch::Modified {
            bytes: bytes.clone(),
            validators: Validators {
                etag: Some(etag.clone()),
                ..Validators::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_etag_revalidation() {
        let backend = MockBackend::default().with_payload("\"v1\"", b"one".to_vec());
        let Fetch::Modified { validators, .. } = backend.fetch(&Validators::default()).await.unwrap() else {
            panic!("empty validators must fetch");
        };
        assert!(!backend.fetch(&validators).await.unwrap().is_modified());

        backend.set_payload("\"v2\"", b"two".to_vec()).await;
        let Fetch::Modified { bytes, .. } = backend.fetch(&validators).await.unwrap() else {
            panic!("new etag must fetch");
        };
        assert_eq!(bytes, b"two");
        assert_eq!(backend.fetches(), 3);
    }

    #[tokio::test]
    async fn test_failures() {
        let backend = MockBackend::default();
        let err = backend.fetch(&Validators::default()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::SourceUnavailable(_)));

        backend.set_payload("\"v1\"", b"one".to_vec()).await;
        backend.set_failing(true).await;
        let err = backend.fetch(&Validators::default()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
    }
}
