//! Dataset cache manager.
//!
//! Owns the one resident [`Dataset`] and decides when to go back to the
//! source for a new one. The rules:
//!
//! - A dataset checked less than `interval` ago, for the current source, is
//!   served as-is without touching the source at all.
//! - Otherwise the source is revalidated with whatever validators we hold
//!   (`ETag`/`Last-Modified` for remote sources, mtime for local files). An
//!   unchanged answer just bumps the check time.
//! - Concurrent callers that find the cache stale share a single load. A
//!   caller never joins a load for a source other than the current one.
//! - A failed load keeps serving the previous dataset if there is one, and
//!   is only an error when there is nothing to fall back to.

use crate::db::Dataset;
use crate::error::{ErrorKind, Result};
use exn::{Exn, ResultExt};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use skilldex_storage::{BackendHandle, DataSource, Fetch, Validators};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::instrument;

type SharedLoad = Shared<BoxFuture<'static, std::result::Result<Arc<Dataset>, ErrorKind>>>;

/// What we know about the resident dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheMetadata {
    /// Key of the source the validators belong to.
    pub source: Option<String>,
    pub validators: Validators,
    /// Last time the source was consulted, successfully or not.
    pub last_checked: Option<Instant>,
}

#[derive(Debug, Default)]
struct State {
    dataset: Option<Arc<Dataset>>,
    meta: CacheMetadata,
}

/// The load currently running, and the source key it loads from.
struct InFlight {
    key: String,
    load: SharedLoad,
}

struct Inner {
    backend: RwLock<BackendHandle>,
    state: RwLock<State>,
    inflight: Mutex<Option<InFlight>>,
    interval: Duration,
}

enum Refreshed {
    Unchanged(Validators),
    Replaced(Arc<Dataset>, Validators),
}

/// Shared handle to the dataset cache. Clones share the same cache.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

impl CacheManager {
    pub fn new(backend: BackendHandle, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: RwLock::new(backend),
                state: RwLock::new(State::default()),
                inflight: Mutex::new(None),
                interval,
            }),
        }
    }

    /// The source currently configured.
    pub async fn source(&self) -> DataSource {
        self.inner.backend.read().await.source().clone()
    }

    /// Point the cache at a different source.
    ///
    /// The resident dataset keeps being served until the first request
    /// after the switch, which loads from the new source from scratch.
    pub async fn set_backend(&self, backend: BackendHandle) {
        let mut current = self.inner.backend.write().await;
        tracing::info!(from = %current.source(), to = %backend.source(), "switching dataset source");
        *current = backend;
    }

    /// Force the next request to revalidate, regardless of the interval.
    pub async fn invalidate(&self) {
        self.inner.state.write().await.meta.last_checked = None;
    }

    pub async fn metadata(&self) -> CacheMetadata {
        self.inner.state.read().await.meta.clone()
    }

    /// Drop the resident dataset and everything known about it.
    pub async fn close(&self) {
        let previous = {
            let mut state = self.inner.state.write().await;
            state.meta = CacheMetadata::default();
            state.dataset.take()
        };
        if let Some(previous) = previous {
            release(previous).await;
        }
    }

    /// Get a ready dataset, loading or revalidating first if needed.
    ///
    /// Fails only if there is no dataset to serve at all.
    #[instrument(skip(self))]
    pub async fn dataset(&self) -> Result<Arc<Dataset>> {
        loop {
            let backend = Arc::clone(&*self.inner.backend.read().await);
            let key = backend.source().key().to_string();
            if let Some(dataset) = self.fresh(&key).await {
                return Ok(dataset);
            }

            let (load, current) = {
                let mut inflight = self.inner.inflight.lock().await;
                match inflight.as_ref() {
                    Some(flight) => (flight.load.clone(), flight.key == key),
                    None => {
                        // Someone else's load may have finished since we looked.
                        if let Some(dataset) = self.fresh(&key).await {
                            return Ok(dataset);
                        }
                        let pending = load(Arc::clone(&self.inner), backend).boxed().shared();
                        *inflight = Some(InFlight {
                            key,
                            load: pending.clone(),
                        });
                        (pending, true)
                    },
                }
            };
            let outcome = load.clone().await;

            let mut inflight = self.inner.inflight.lock().await;
            if inflight.as_ref().is_some_and(|flight| flight.load.ptr_eq(&load)) {
                *inflight = None;
            }
            if current {
                return outcome.map_err(Exn::from);
            }
            tracing::debug!("waited on a load for the previous source, loading again");
        }
    }

    async fn fresh(&self, key: &str) -> Option<Arc<Dataset>> {
        let state = self.inner.state.read().await;
        let dataset = state.dataset.as_ref()?;
        let checked = state.meta.last_checked?;
        let fresh = state.meta.source.as_deref() == Some(key) && checked.elapsed() < self.inner.interval;
        fresh.then(|| Arc::clone(dataset))
    }
}

#[instrument(skip_all, fields(source = %backend.source()))]
async fn load(inner: Arc<Inner>, backend: BackendHandle) -> std::result::Result<Arc<Dataset>, ErrorKind> {
    let key = backend.source().key().to_string();
    let (previous, cached) = {
        let state = inner.state.read().await;
        // Validators only mean something for the source they came from, and
        // only while we still hold the dataset they describe.
        let cached = match &state.dataset {
            Some(_) if state.meta.source.as_deref() == Some(key.as_str()) => state.meta.validators.clone(),
            _ => Validators::default(),
        };
        (state.dataset.clone(), cached)
    };

    let refreshed = refresh(&backend, &cached).await;
    let mut state = inner.state.write().await;
    let now = Instant::now();
    match refreshed {
        Ok(Refreshed::Unchanged(validators)) => {
            let Some(dataset) = previous else {
                return Err(ErrorKind::Source {
                    message: "source reported an unchanged dataset with nothing cached".to_string(),
                    retryable: false,
                });
            };
            tracing::debug!("dataset not modified");
            state.meta.validators = validators;
            state.meta.last_checked = Some(now);
            Ok(dataset)
        },
        Ok(Refreshed::Replaced(dataset, validators)) => {
            drop(previous);
            let replaced = state.dataset.replace(Arc::clone(&dataset));
            state.meta = CacheMetadata {
                source: Some(key),
                validators,
                last_checked: Some(now),
            };
            drop(state);
            if let Some(replaced) = replaced {
                release(replaced).await;
            }
            Ok(dataset)
        },
        Err(err) => match previous {
            Some(dataset) => {
                tracing::warn!(error = ?err, "revalidation failed, serving cached dataset");
                // After a source switch the fallback is the *old* source's
                // dataset; leave it looking stale so the next request retries.
                if state.meta.source.as_deref() == Some(key.as_str()) {
                    state.meta.last_checked = Some(now);
                }
                Ok(dataset)
            },
            None => {
                tracing::error!(error = ?err, "dataset load failed");
                Err((*err).clone())
            },
        },
    }
}

async fn refresh(backend: &BackendHandle, cached: &Validators) -> Result<Refreshed> {
    tracing::debug!(conditional = !cached.is_empty(), "fetching dataset");
    let fetched = match backend.fetch(cached).await {
        Ok(fetched) => fetched,
        Err(err) => {
            let kind = ErrorKind::Source {
                message: (*err).to_string(),
                retryable: err.is_retryable(),
            };
            return Err(err).or_raise(|| kind);
        },
    };
    tracing::debug!(modified = fetched.is_modified(), "source answered");
    match fetched {
        Fetch::NotModified(validators) => Ok(Refreshed::Unchanged(validators)),
        Fetch::Modified { bytes, validators } => {
            let dataset = Dataset::from_bytes(bytes).await?;
            Ok(Refreshed::Replaced(Arc::new(dataset), validators))
        },
    }
}

/// Close a dataset we're done with, unless a query is still using it. In
/// that case the last query to finish drops it, which releases it just the
/// same.
async fn release(dataset: Arc<Dataset>) {
    match Arc::try_unwrap(dataset) {
        Ok(dataset) => dataset.close().await,
        Err(_) => tracing::debug!("previous dataset still in use, releasing on last drop"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use skilldex_storage::backend::{LocalBackend, MockBackend};
    use std::time::SystemTime;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn mock_manager(interval: Duration) -> (Arc<MockBackend>, CacheManager) {
        let backend = Arc::new(MockBackend::default().with_payload("\"v1\"", fixture::alpha_beta().await));
        let manager = CacheManager::new(backend.clone(), interval);
        (backend, manager)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_loads_share_one_fetch() {
        let backend = Arc::new(
            MockBackend::default()
                .with_payload("\"v1\"", fixture::alpha_beta().await)
                .with_delay(Duration::from_millis(100)),
        );
        let manager = CacheManager::new(backend.clone(), HOUR);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.dataset().await.unwrap() })
            })
            .collect();
        let mut datasets = Vec::new();
        for handle in handles {
            datasets.push(handle.await.unwrap());
        }
        assert_eq!(backend.fetches(), 1);
        assert!(datasets.iter().all(|d| Arc::ptr_eq(d, &datasets[0])));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_revalidations_share_one_fetch() {
        let backend = Arc::new(
            MockBackend::default()
                .with_payload("\"v1\"", fixture::alpha_beta().await)
                .with_delay(Duration::from_millis(100)),
        );
        let manager = CacheManager::new(backend.clone(), HOUR);
        let first = manager.dataset().await.unwrap();

        manager.invalidate().await;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.dataset().await.unwrap() })
            })
            .collect();
        for handle in handles {
            assert!(Arc::ptr_eq(&handle.await.unwrap(), &first));
        }
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_switch_during_load_waits_for_new_source() {
        let slow = Arc::new(
            MockBackend::default()
                .with_payload("\"v1\"", fixture::alpha_beta().await)
                .with_delay(Duration::from_millis(300)),
        );
        let manager = CacheManager::new(slow.clone(), HOUR);
        let early = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.dataset().await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let other = MockBackend::new(DataSource::local("b/skills.db"))
            .with_payload("\"v1\"", fixture::database(&["CREATE TABLE skill (id INTEGER)"]).await);
        let other = Arc::new(other);
        manager.set_backend(other.clone()).await;
        let switched = manager.dataset().await.unwrap();

        assert_eq!(switched.table(), "skill");
        assert_eq!(other.fetches(), 1);
        assert_eq!(manager.metadata().await.source.as_deref(), Some("local:b/skills.db"));
        // The caller that started before the switch still gets its own load.
        assert_eq!(early.await.unwrap().table(), "skills");
        assert_eq!(slow.fetches(), 1);
    }

    #[tokio::test]
    async fn test_fresh_dataset_is_reused() {
        let (backend, manager) = mock_manager(HOUR).await;
        let first = manager.dataset().await.unwrap();
        let second = manager.dataset().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.fetches(), 1);
    }

    #[tokio::test]
    async fn test_stale_dataset_revalidates_once() {
        let (backend, manager) = mock_manager(Duration::from_millis(50)).await;
        manager.dataset().await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        manager.dataset().await.unwrap();
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn test_not_modified_keeps_dataset_and_advances_check() {
        let (backend, manager) = mock_manager(HOUR).await;
        let first = manager.dataset().await.unwrap();
        let before = manager.metadata().await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.invalidate().await;
        let second = manager.dataset().await.unwrap();
        let after = manager.metadata().await;

        assert_eq!(backend.fetches(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(after.validators, before.validators);
        assert!(after.last_checked > before.last_checked);
    }

    #[tokio::test]
    async fn test_modified_dataset_is_replaced() {
        let (backend, manager) = mock_manager(HOUR).await;
        let first = manager.dataset().await.unwrap();
        let other = fixture::database(&["CREATE TABLE skill (id INTEGER)"]).await;
        backend.set_payload("\"v2\"", other).await;

        manager.invalidate().await;
        let second = manager.dataset().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.table(), "skill");
        assert_eq!(manager.metadata().await.validators.etag.as_deref(), Some("\"v2\""));
        // Still usable by whoever held on to it.
        assert_eq!(first.table(), "skills");
    }

    #[tokio::test]
    async fn test_failed_revalidation_serves_previous() {
        let (backend, manager) = mock_manager(HOUR).await;
        let first = manager.dataset().await.unwrap();
        let before = manager.metadata().await;

        backend.set_failing(true).await;
        manager.invalidate().await;
        let second = manager.dataset().await.unwrap();
        let after = manager.metadata().await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(after.validators, before.validators);
        assert!(after.last_checked.is_some());
    }

    #[tokio::test]
    async fn test_failed_first_load_propagates() {
        let backend = Arc::new(MockBackend::default());
        let manager = CacheManager::new(backend.clone(), HOUR);
        let err = manager.dataset().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Source { retryable: false, .. }));

        // Nothing was cached, so the next call tries again.
        backend.set_payload("\"v1\"", fixture::alpha_beta().await).await;
        manager.dataset().await.unwrap();
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_first_load_propagates() {
        let backend = Arc::new(MockBackend::default().with_payload("\"v1\"", b"<html>oops</html>".to_vec()));
        let manager = CacheManager::new(backend, HOUR);
        let err = manager.dataset().await.unwrap_err();
        assert_eq!(*err, ErrorKind::ParseError);
    }

    #[tokio::test]
    async fn test_source_switch_reloads_from_scratch() {
        let (first_backend, manager) = mock_manager(HOUR).await;
        let first = manager.dataset().await.unwrap();

        // Same ETag on a different source must not count as "unchanged".
        let other = MockBackend::new(DataSource::local("elsewhere/skills.db"))
            .with_payload("\"v1\"", fixture::database(&["CREATE TABLE skill (id INTEGER)"]).await);
        let other = Arc::new(other);
        manager.set_backend(other.clone()).await;
        let second = manager.dataset().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.table(), "skill");
        assert_eq!(first_backend.fetches(), 1);
        assert_eq!(other.fetches(), 1);
        assert_eq!(manager.metadata().await.source.as_deref(), Some("local:elsewhere/skills.db"));
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_retrying() {
        let (_, manager) = mock_manager(HOUR).await;
        let first = manager.dataset().await.unwrap();

        let broken = Arc::new(MockBackend::new(DataSource::local("missing/skills.db")));
        manager.set_backend(broken.clone()).await;
        assert!(Arc::ptr_eq(&manager.dataset().await.unwrap(), &first));
        assert!(Arc::ptr_eq(&manager.dataset().await.unwrap(), &first));
        assert_eq!(broken.fetches(), 2);
    }

    #[tokio::test]
    async fn test_local_file_revalidates_by_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.db");
        std::fs::write(&path, fixture::alpha_beta().await).unwrap();
        let manager = CacheManager::new(Arc::new(LocalBackend::new(&path)), HOUR);

        let first = manager.dataset().await.unwrap();
        manager.invalidate().await;
        let second = manager.dataset().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        std::fs::write(&path, fixture::database(&["CREATE TABLE skill (id INTEGER)"]).await).unwrap();
        let later = SystemTime::now() + Duration::from_secs(60);
        std::fs::File::options().write(true).open(&path).unwrap().set_modified(later).unwrap();
        manager.invalidate().await;
        let third = manager.dataset().await.unwrap();
        assert_eq!(third.table(), "skill");
    }

    #[tokio::test]
    async fn test_close_forgets_everything() {
        let (backend, manager) = mock_manager(HOUR).await;
        manager.dataset().await.unwrap();
        manager.close().await;
        assert_eq!(manager.metadata().await, CacheMetadata::default());
        manager.dataset().await.unwrap();
        assert_eq!(backend.fetches(), 2);
    }
}
