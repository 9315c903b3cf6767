//! Remote (HTTP) source backend.
//!
//! Datasets can be big, and most revalidations find nothing new. So the
//! revalidation is two-phase:
//!
//! 1. A conditional `HEAD`. A `304`, or a `2xx` whose `ETag`/`Last-Modified`
//!    match what we already have, means we're done without a body transfer.
//!    Some servers (and a surprising number of CDNs) reject or mangle `HEAD`,
//!    so any failure here just moves on to step 2.
//! 2. A conditional `GET` with the same validators. `304` means unchanged,
//!    `2xx` means a new dataset, anything else is a failure.

use crate::backend::SourceBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{Fetch, Validators};
use crate::source::DataSource;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::header::{ETAG, HeaderMap, HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::instrument;

const USER_AGENT: &str = concat!("skilldex/", env!("CARGO_PKG_VERSION"));

/// Remote source backend performing conditional revalidation.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    source: DataSource,
    url: Url,
    client: Client,
}
impl HttpBackend {
    /// Create a backend for the dataset at `url`.
    ///
    /// `timeout` applies to each request as a whole (connect + body), so it
    /// needs to be generous enough to download the full dataset.
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .or_raise(|| ErrorKind::InvalidSource(url.to_string()))?;
        Ok(Self {
            source: DataSource::remote(url.clone()),
            url,
            client,
        })
    }

    /// Build `If-None-Match`/`If-Modified-Since` from whatever we have cached.
    ///
    /// Validators that aren't valid header values (they came from a header
    /// in the first place, so this "can't happen") are dropped rather than
    /// failing the whole revalidation.
    fn conditional_headers(cached: &Validators) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let pairs = [(IF_NONE_MATCH, &cached.etag), (IF_MODIFIED_SINCE, &cached.last_modified)];
        for (name, value) in pairs {
            let Some(value) = value else { continue };
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(name, value);
                },
                Err(_) => tracing::warn!(header = %name, value = %value, "dropping unusable cached validator"),
            }
        }
        headers
    }

    fn response_validators(headers: &HeaderMap) -> Validators {
        let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        Validators {
            etag: header(ETAG),
            last_modified: header(LAST_MODIFIED),
            mtime_ms: None,
        }
    }

    /// Phase one. Returns `Some` only if the `HEAD` proves nothing changed.
    async fn probe(&self, headers: &HeaderMap, cached: &Validators) -> Option<Fetch> {
        let response = match self.client.head(self.url.clone()).headers(headers.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "HEAD failed, falling back to GET");
                return None;
            },
        };
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!("HEAD answered 304");
            return Some(Fetch::NotModified(cached.clone()));
        }
        if status.is_success() && cached.same_http_content(&Self::response_validators(response.headers())) {
            // Server ignores conditional HEAD, but the validators give it away.
            tracing::debug!("HEAD validators match cached copy");
            return Some(Fetch::NotModified(cached.clone()));
        }
        tracing::debug!(%status, "HEAD inconclusive, falling back to GET");
        None
    }
}

#[async_trait]
impl SourceBackend for HttpBackend {
    fn source(&self) -> &DataSource {
        &self.source
    }

    #[instrument(skip(self, cached), fields(url = %self.url))]
    async fn fetch(&self, cached: &Validators) -> Result<Fetch> {
        let headers = Self::conditional_headers(cached);
        if let Some(unchanged) = self.probe(&headers, cached).await {
            return Ok(unchanged);
        }

        let response = self
            .client
            .get(self.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| ErrorKind::Network(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!("GET answered 304");
            return Ok(Fetch::NotModified(cached.clone()));
        }
        if !status.is_success() {
            exn::bail!(ErrorKind::FetchFailed(status.as_u16()));
        }
        let validators = Self::response_validators(response.headers());
        let bytes = response.bytes().await.map_err(|e| ErrorKind::Network(e.to_string()))?.to_vec();
        tracing::info!(bytes = bytes.len(), etag = ?validators.etag, "downloaded dataset");
        Ok(Fetch::Modified { bytes, validators })
    }
}
