//! Dataset source descriptors.
//!
//! A [`DataSource`] says *where* the dataset lives and doubles as the cache
//! identity: two sources with the same [`key`](DataSource::key) are the same
//! dataset as far as the cache is concerned, anything else is a different
//! dataset and previously cached validators are worthless for it.

use reqwest::Url;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// Where the bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Path(PathBuf),
    Url(Url),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    Remote,
}

/// A resolved dataset source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    key: String,
    locator: Locator,
}

impl DataSource {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            key: format!("local:{}", path.display()),
            locator: Locator::Path(path),
        }
    }

    pub fn remote(url: Url) -> Self {
        Self {
            key: format!("remote:{url}"),
            locator: Locator::Url(url),
        }
    }

    /// Pick the source from configuration.
    ///
    /// The remote setting wins, but only when it parses as an absolute
    /// `http`/`https` URL with a host. Anything else (unset, blank, a typo,
    /// `ftp://`) silently falls back to the local path. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use skilldex_storage::{DataSource, SourceKind};
    ///
    /// let source = DataSource::resolve(Some("https://cdn.example.com/skills.db"), "data/skills.db");
    /// assert_eq!(source.kind(), SourceKind::Remote);
    ///
    /// let source = DataSource::resolve(Some("not a url"), "data/skills.db");
    /// assert_eq!(source.kind(), SourceKind::Local);
    /// ```
    pub fn resolve(remote: Option<&str>, local: impl AsRef<Path>) -> Self {
        match remote.and_then(parse_remote) {
            Some(url) => Self::remote(url),
            None => Self::local(local.as_ref()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn kind(&self) -> SourceKind {
        match self.locator {
            Locator::Path(_) => SourceKind::Local,
            Locator::Url(_) => SourceKind::Remote,
        }
    }
}

impl Display for DataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.key)
    }
}

/// Returns the URL if (and only if) it is something we know how to revalidate.
pub fn parse_remote(value: &str) -> Option<Url> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let url = Url::parse(value).ok()?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, SourceKind::Local)]
    #[case(Some(""), SourceKind::Local)]
    #[case(Some("   "), SourceKind::Local)]
    #[case(Some("skills.db"), SourceKind::Local)]
    #[case(Some("ftp://example.com/skills.db"), SourceKind::Local)]
    #[case(Some("file:///srv/skills.db"), SourceKind::Local)]
    #[case(Some("http://"), SourceKind::Local)]
    #[case(Some("http://example.com/skills.db"), SourceKind::Remote)]
    #[case(Some("https://cdn.example.com/data/skills.db.gz"), SourceKind::Remote)]
    #[case(Some("  https://cdn.example.com/skills.db  "), SourceKind::Remote)]
    fn test_resolve_kind(#[case] remote: Option<&str>, #[case] expected: SourceKind) {
        assert_eq!(DataSource::resolve(remote, "data/skills.db").kind(), expected);
    }

    #[test]
    fn test_keys_discriminate_sources() {
        let local = DataSource::resolve(None, "data/skills.db");
        assert_eq!(local.key(), "local:data/skills.db");
        let remote = DataSource::resolve(Some("https://cdn.example.com/skills.db"), "data/skills.db");
        assert_eq!(remote.key(), "remote:https://cdn.example.com/skills.db");
        assert_ne!(local.key(), remote.key());
        assert_eq!(local, DataSource::local("data/skills.db"));
    }
}
