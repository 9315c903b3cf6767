//! Source backend trait and implementations.
//!
//! This module defines the `SourceBackend` trait, which gives the cache a
//! single way to ask "give me the dataset, unless it hasn't changed since
//! these validators" regardless of whether the dataset sits on local disk or
//! behind an HTTP server.

mod http;
mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::http::HttpBackend;
pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::{Fetch, Validators};
use crate::source::{DataSource, Locator};
use crate::BackendHandle;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Unified interface for dataset sources.
///
/// A backend is bound to exactly one [`DataSource`] for its whole life. To
/// point the cache somewhere else, build a new backend.
///
/// # Examples
///
/// ```no_run
/// use skilldex_storage::{backend::SourceBackend, error::Result, Fetch, Validators};
///
/// async fn download_unless_unchanged(backend: &dyn SourceBackend, cached: &Validators) -> Result<Option<Vec<u8>>> {
///     Ok(match backend.fetch(cached).await? {
///         Fetch::NotModified(_) => None,
///         Fetch::Modified { bytes, .. } => Some(bytes),
///     })
/// }
/// ```
#[async_trait]
pub trait SourceBackend: Send + Sync {
    /// The source this backend reads from. Its key is what the cache uses
    /// to decide whether previously cached validators still apply.
    fn source(&self) -> &DataSource;

    /// Fetch the dataset, or report that it is unchanged.
    ///
    /// Passing empty [`Validators`] always results in
    /// [`Fetch::Modified`] (or an error).
    async fn fetch(&self, cached: &Validators) -> Result<Fetch>;
}

/// Build the backend matching a data source.
pub fn open(source: DataSource, http_timeout: Duration) -> Result<BackendHandle> {
    Ok(match source.locator().clone() {
        Locator::Path(path) => Arc::new(LocalBackend::new(path)),
        Locator::Url(url) => Arc::new(HttpBackend::new(url, http_timeout)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceKind;

    #[test]
    fn test_open_picks_backend_for_source() {
        let local = open(DataSource::local("data/skills.db"), Duration::from_secs(5)).unwrap();
        assert_eq!(local.source().kind(), SourceKind::Local);
        let remote = DataSource::resolve(Some("https://cdn.example.com/skills.db"), "data/skills.db");
        let remote = open(remote, Duration::from_secs(5)).unwrap();
        assert_eq!(remote.source().key(), "remote:https://cdn.example.com/skills.db");
    }
}
