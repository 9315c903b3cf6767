//! Layered configuration.
//!
//! Later layers win:
//! 1. built-in defaults,
//! 2. a TOML file (`skilldex.toml` in the working directory or one of its
//!    parents, or an explicit path),
//! 3. `SKILLDEX_*` environment variables (`SKILLDEX_DATASET_URL`,
//!    `SKILLDEX_DATASET_PATH`, `SKILLDEX_REVALIDATE_INTERVAL_MS`,
//!    `SKILLDEX_HTTP_TIMEOUT_MS`).

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use skilldex_storage::{BackendHandle, DataSource, backend, parse_remote};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SKILLDEX_";
pub const DEFAULT_FILE: &str = "skilldex.toml";

/// Four hours.
pub const DEFAULT_REVALIDATE_INTERVAL_MS: u64 = 4 * 60 * 60 * 1000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote dataset. Only honoured if it is an `http(s)://` URL.
    pub dataset_url: Option<String>,
    /// Local dataset, used when there is no usable remote one.
    pub dataset_path: PathBuf,
    /// How long a loaded dataset is served before checking the source again.
    pub revalidate_interval_ms: u64,
    /// Per-request timeout for the remote source, download included.
    pub http_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_url: None,
            dataset_path: PathBuf::from("data/skills.db"),
            revalidate_interval_ms: DEFAULT_REVALIDATE_INTERVAL_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// All configuration layers, unextracted.
    pub fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match file {
            Some(path) => figment.merge(Toml::file_exact(path)),
            None => figment.merge(Toml::file(DEFAULT_FILE)),
        };
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration, optionally from an explicit TOML file.
    ///
    /// Without an explicit file a missing `skilldex.toml` is fine; with one,
    /// it's an error.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file
            && !path.is_file()
        {
            exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
        }
        let config: Self = Self::figment(file).extract().or_raise(|| ErrorKind::Load)?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Resolve the dataset source.
    ///
    /// Never fails: a URL we can't use is logged and the local path is used
    /// instead.
    pub fn source(&self) -> DataSource {
        if let Some(url) = self.dataset_url.as_deref().map(str::trim)
            && !url.is_empty()
            && parse_remote(url).is_none()
        {
            tracing::warn!(url, path = %self.dataset_path.display(), "ignoring dataset URL that is not http(s), using local path");
        }
        DataSource::resolve(self.dataset_url.as_deref(), &self.dataset_path)
    }

    /// Backend for [`source`](Self::source).
    pub fn backend(&self) -> skilldex_storage::error::Result<BackendHandle> {
        backend::open(self.source(), self.http_timeout())
    }

    pub fn revalidate_interval(&self) -> Duration {
        Duration::from_millis(self.revalidate_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
