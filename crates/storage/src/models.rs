//! Storage models.
//!
//! These types carry cache validators between the cache manager and the
//! source backends, and the outcome of asking a backend for the dataset.

/// Whatever a backend needs to decide "has this changed since last time?".
///
/// Remote backends use the HTTP validators, local backends use the file
/// modification time. A default (empty) value means "nothing cached", which
/// forces a full fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    /// `ETag` response header, verbatim (quotes and `W/` prefix included).
    pub etag: Option<String>,
    /// `Last-Modified` response header, verbatim.
    pub last_modified: Option<String>,
    /// File modification time in milliseconds since the Unix epoch.
    pub mtime_ms: Option<i64>,
}
impl Validators {
    pub fn from_mtime(mtime_ms: i64) -> Self {
        Self {
            mtime_ms: Some(mtime_ms),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none() && self.mtime_ms.is_none()
    }

    /// Does `other` describe the same remote content as `self`?
    ///
    /// Either HTTP validator matching is enough; a missing validator never
    /// matches anything.
    pub fn same_http_content(&self, other: &Validators) -> bool {
        let etag = self.etag.is_some() && self.etag == other.etag;
        let last_modified = self.last_modified.is_some() && self.last_modified == other.last_modified;
        etag || last_modified
    }
}

/// Result of asking a backend for the dataset.
#[derive(Debug)]
pub enum Fetch {
    /// Content unchanged since the validators passed in; carries the
    /// validators to keep on record.
    NotModified(Validators),
    /// Fresh content (the whole dataset) and its new validators.
    Modified { bytes: Vec<u8>, validators: Validators },
}
impl Fetch {
    pub fn is_modified(&self) -> bool {
        matches!(self, Self::Modified { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(etag: Option<&str>, last_modified: Option<&str>) -> Validators {
        Validators {
            etag: etag.map(str::to_string),
            last_modified: last_modified.map(str::to_string),
            mtime_ms: None,
        }
    }

    #[rstest]
    #[case(v(Some("\"a\""), None), v(Some("\"a\""), None), true)]
    #[case(v(Some("\"a\""), None), v(Some("\"b\""), None), false)]
    #[case(v(None, Some("Mon, 01 Jan 2024 00:00:00 GMT")), v(Some("\"b\""), Some("Mon, 01 Jan 2024 00:00:00 GMT")), true)]
    #[case(v(None, None), v(None, None), false)]
    #[case(v(Some("\"a\""), None), v(None, None), false)]
    fn test_same_http_content(#[case] cached: Validators, #[case] fresh: Validators, #[case] expected: bool) {
        assert_eq!(cached.same_http_content(&fresh), expected);
    }

    #[test]
    fn test_empty() {
        assert!(Validators::default().is_empty());
        assert!(!Validators::from_mtime(0).is_empty());
    }
}
