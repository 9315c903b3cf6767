//! Parsing of list-valued fields (tags, categories).

use serde_json::Value;

const DELIMITERS: &[char] = &[',', ';', '|', '\n'];
const QUOTES: &[char] = &['"', '\''];

/// Parse a raw list-ish value into trimmed, non-empty strings.
///
/// Accepts a native JSON array, a string holding a serialized JSON array
/// (`"[\"a\", \"b\"]"`), or a delimited string (`"a, b; c|d"`). Scalars
/// become a one-element list. Anything else, including a JSON object, is an
/// empty list.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use skilldex_records::parse_list;
///
/// assert_eq!(parse_list(Some(&json!("a,b,c"))), ["a", "b", "c"]);
/// assert_eq!(parse_list(Some(&json!("[\"a\", \"b\"]"))), ["a", "b"]);
/// assert!(parse_list(None).is_empty());
/// ```
pub fn parse_list(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).filter_map(clean).collect(),
        Some(Value::String(s)) => parse_list_str(s),
        Some(value @ (Value::Number(_) | Value::Bool(_))) => scalar_text(value).into_iter().collect(),
        Some(Value::Object(_) | Value::Null) | None => Vec::new(),
    }
}

fn parse_list_str(s: &str) -> Vec<String> {
    let trimmed = s.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Array(_)) => return parse_list(Some(&value)),
            Ok(Value::Object(_)) => return Vec::new(),
            // Python-style `['a', 'b']` and friends. Peel the brackets and
            // treat it as delimited.
            _ => return split_delimited(trimmed.trim_start_matches('[').trim_end_matches(']')),
        }
    }
    split_delimited(trimmed)
}

fn split_delimited(s: &str) -> Vec<String> {
    s.split(DELIMITERS).filter_map(clean).collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn clean(item: impl AsRef<str>) -> Option<String> {
    let item = item.as_ref().trim().trim_matches(QUOTES).trim();
    (!item.is_empty()).then(|| item.to_string())
}

/// Best-effort single category for a row.
///
/// In order:
/// 1. the first entry of [`parse_list`];
/// 2. for a JSON object (native or serialized), its `primary`, `name` or
///    `category` string;
/// 3. the raw text with brackets, braces and quotes stripped, cut at the
///    first delimiter.
///
/// Returns an empty string when nothing usable is left.
pub fn pick_category(raw: Option<&Value>) -> String {
    if let Some(first) = parse_list(raw).into_iter().next() {
        return first;
    }
    let object = match raw {
        Some(Value::Object(map)) => Some(map.clone()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    };
    if let Some(map) = object {
        return ["primary", "name", "category"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str).and_then(clean))
            .unwrap_or_default();
    }
    match raw {
        Some(Value::String(s)) => {
            let stripped: String = s.chars().filter(|c| !matches!(c, '[' | ']' | '{' | '}' | '"' | '\'')).collect();
            split_delimited(&stripped).into_iter().next().unwrap_or_default()
        },
        _ => String::new(),
    }
}
