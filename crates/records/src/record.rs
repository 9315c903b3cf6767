use crate::fields::Field;
use crate::list::{parse_list, pick_category};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A dataset row as read from the database: column name to value.
pub type Row = Map<String, Value>;

/// Row identifier as stored in the dataset.
///
/// Most datasets use integer primary keys, but some use UUIDs or slugs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillId {
    Int(i64),
    Text(String),
}
impl SkillId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => Some(Self::Text(n.to_string())),
            },
            Value::String(s) if !s.trim().is_empty() => Some(Self::Text(s.trim().to_string())),
            _ => None,
        }
    }
}
impl Display for SkillId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SkillId::Int(i) => write!(f, "{i}"),
            SkillId::Text(s) => f.write_str(s),
        }
    }
}

/// The canonical, stable-shaped skill record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: Option<SkillId>,
    /// Never empty. See [`SkillRecord::from_row`].
    pub identifier: String,
    pub skill_name: String,
    #[serde(rename = "fromRepo")]
    pub from_repo: String,
    #[serde(rename = "skillPath")]
    pub skill_path: String,
    pub repostars: i64,
    pub tagline: String,
    pub category: String,
    pub description: String,
    pub description_en: String,
    pub use_case: String,
    pub use_case_en: String,
    pub download_url: String,
    pub content: String,
    pub content_en: String,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<String>,
    pub tags_en: Vec<String>,
    pub categories: Vec<String>,
}

impl SkillRecord {
    /// Normalize a raw row.
    ///
    /// `position` is the row's zero-based position in the result set it came
    /// from; it only matters for rows with neither an `id` nor a name.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use skilldex_records::SkillRecord;
    ///
    /// let row = json!({"skillName": "Foo Bar", "stars": "12", "tags": "a, b"});
    /// let record = SkillRecord::from_row(row.as_object().unwrap(), 0);
    /// assert_eq!(record.identifier, "Foo%20Bar");
    /// assert_eq!(record.repostars, 12);
    /// assert_eq!(record.tags, ["a", "b"]);
    /// ```
    pub fn from_row(row: &Row, position: usize) -> Self {
        let text = |field: Field| field.lookup(row).map(value_text).unwrap_or_default();
        let id = Field::Id.lookup(row).and_then(SkillId::from_value);
        let skill_name = text(Field::SkillName);
        let raw_categories = Field::Categories.lookup(row);
        let categories = parse_list(raw_categories);
        let category = match categories.first() {
            Some(first) => first.clone(),
            None => pick_category(raw_categories),
        };
        let identifier = match &id {
            Some(id) => id.to_string(),
            None if !skill_name.trim().is_empty() => encode_identifier(&skill_name),
            None => (position + 1).to_string(),
        };
        Self {
            identifier,
            id,
            skill_name,
            from_repo: text(Field::FromRepo),
            skill_path: text(Field::SkillPath),
            repostars: Field::RepoStars.lookup(row).map(value_int).unwrap_or_default(),
            tagline: text(Field::Tagline),
            category,
            description: text(Field::Description),
            description_en: text(Field::DescriptionEn),
            use_case: text(Field::UseCase),
            use_case_en: text(Field::UseCaseEn),
            download_url: text(Field::DownloadUrl),
            content: text(Field::Content),
            content_en: text(Field::ContentEn),
            created_at: text(Field::CreatedAt),
            updated_at: text(Field::UpdatedAt),
            tags: parse_list(Field::Tags.lookup(row)),
            tags_en: parse_list(Field::TagsEn.lookup(row)),
            categories,
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or_default(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64)).unwrap_or_default()
        },
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

/// Percent-encode a skill name for use as an identifier.
///
/// Same character set as JavaScript's `encodeURIComponent`, so identifiers
/// stay stable for links that were generated elsewhere: `urlencoding` also
/// escapes `!'()*`, which are put back here.
pub fn encode_identifier(name: &str) -> String {
    let encoded = urlencoding::encode(name);
    if !encoded.contains('%') {
        return encoded.into_owned();
    }
    [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")]
        .iter()
        .fold(encoded.into_owned(), |acc, (from, to)| acc.replace(from, to))
}
