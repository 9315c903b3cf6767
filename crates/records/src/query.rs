//! Query and result shapes for listing skills.

use crate::record::SkillRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Sort {
    /// Most recently updated first.
    #[default]
    Latest,
    /// Least recently updated first.
    Oldest,
    /// Most repository stars first.
    Stars,
}
impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Latest => "latest",
            Sort::Oldest => "oldest",
            Sort::Stars => "stars",
        }
    }
}
impl From<&str> for Sort {
    /// Unknown values fall back to [`Sort::Latest`] instead of failing.
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "oldest" => Sort::Oldest,
            "stars" => Sort::Stars,
            _ => Sort::Latest,
        }
    }
}
impl From<String> for Sort {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}
impl Display for Sort {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Parameters for listing skills.
///
/// Construct freely; out-of-range values are clamped by
/// [`clamped`](Self::clamped) before a query runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    /// Free-text search over names, descriptions, use cases, tags and categories.
    pub q: String,
    /// Category substring filter.
    pub category: String,
    /// 1-based page number.
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    pub sort: Sort,
}
impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            q: String::new(),
            category: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: Sort::default(),
        }
    }
}
impl QuerySpec {
    /// Page at least 1, page size within `1..=100`, search terms trimmed.
    pub fn clamped(self) -> Self {
        Self {
            q: self.q.trim().to_string(),
            category: self.category.trim().to_string(),
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
            sort: self.sort,
        }
    }

    /// Rows to skip. Only meaningful on a [`clamped`](Self::clamped) spec.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub items: Vec<SkillRecord>,
    /// Number of matching rows across all pages.
    pub total: u64,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}
impl QueryResult {
    /// A result with no matches, echoing the (clamped) paging of `spec`.
    pub fn empty(spec: &QuerySpec) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: spec.page,
            page_size: spec.page_size,
        }
    }
}

/// Category histogram over the whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Total number of rows, categorized or not.
    pub total: u64,
    /// Rows per category. Rows without a category are only counted in `total`.
    pub counts: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("latest", Sort::Latest)]
    #[case("oldest", Sort::Oldest)]
    #[case("STARS", Sort::Stars)]
    #[case(" stars ", Sort::Stars)]
    #[case("popular", Sort::Latest)]
    #[case("", Sort::Latest)]
    fn test_sort_from_str(#[case] input: &str, #[case] expected: Sort) {
        assert_eq!(Sort::from(input), expected);
    }

    #[rstest]
    #[case(0, 0, 1, 1, 0)]
    #[case(1, 20, 1, 20, 0)]
    #[case(2, 10, 2, 10, 10)]
    #[case(3, 500, 3, 100, 200)]
    fn test_clamped(
        #[case] page: u32,
        #[case] page_size: u32,
        #[case] expected_page: u32,
        #[case] expected_size: u32,
        #[case] expected_offset: u64,
    ) {
        let spec = QuerySpec { page, page_size, ..QuerySpec::default() }.clamped();
        assert_eq!((spec.page, spec.page_size, spec.offset()), (expected_page, expected_size, expected_offset));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let spec: QuerySpec = serde_json::from_str(r#"{"q": " rust ", "pageSize": 5, "sort": "nonsense"}"#).unwrap();
        assert_eq!(spec.page, 1);
        assert_eq!(spec.page_size, 5);
        assert_eq!(spec.sort, Sort::Latest);
        assert_eq!(spec.clamped().q, "rust");
    }

    #[test]
    fn test_result_field_names() {
        let result = QueryResult::empty(&QuerySpec::default());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, serde_json::json!({"items": [], "total": 0, "page": 1, "pageSize": 20}));
    }
}
