use serde_json::Value;

use crate::record::Row;

/// Canonical record fields that are read from a dataset row.
///
/// `identifier` and `category` are derived, so they have no entry here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    SkillName,
    FromRepo,
    SkillPath,
    RepoStars,
    Tagline,
    Description,
    DescriptionEn,
    UseCase,
    UseCaseEn,
    DownloadUrl,
    Content,
    ContentEn,
    CreatedAt,
    UpdatedAt,
    Tags,
    TagsEn,
    Categories,
}

impl Field {
    /// Fields covered by free-text search.
    pub const SEARCHABLE: [Field; 9] = [
        Field::SkillName,
        Field::Tagline,
        Field::Description,
        Field::DescriptionEn,
        Field::UseCase,
        Field::UseCaseEn,
        Field::Tags,
        Field::TagsEn,
        Field::Categories,
    ];

    /// Candidate row keys, highest precedence first.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Field::Id => &["id"],
            Field::SkillName => &["skill_name", "skillName", "name", "title"],
            Field::FromRepo => &["from_repo", "fromRepo", "repo", "repository"],
            Field::SkillPath => &["skill_path", "skillPath", "path"],
            Field::RepoStars => &["repostars", "repo_stars", "repoStars", "stars"],
            Field::Tagline => &["tagline", "tag_line", "tagLine", "summary"],
            Field::Description => &["description", "desc"],
            Field::DescriptionEn => &["description_en", "descriptionEn"],
            Field::UseCase => &["use_case", "useCase"],
            Field::UseCaseEn => &["use_case_en", "useCaseEn"],
            Field::DownloadUrl => &["download_url", "downloadUrl", "url"],
            Field::Content => &["content", "body"],
            Field::ContentEn => &["content_en", "contentEn"],
            Field::CreatedAt => &["created_at", "createdAt", "created"],
            Field::UpdatedAt => &["updated_at", "updatedAt", "updated"],
            Field::Tags => &["tags", "keywords"],
            Field::TagsEn => &["tags_en", "tagsEn"],
            Field::Categories => &["categories", "category"],
        }
    }

    /// First non-null value for this field in `row`.
    pub fn lookup<'r>(&self, row: &'r Row) -> Option<&'r Value> {
        self.keys().iter().filter_map(|key| row.get(*key)).find(|value| !value.is_null())
    }

    /// Which of the table's `columns` backs this field, if any.
    ///
    /// SQLite column names are case-insensitive, so matching is too. The
    /// returned name is the column's own spelling.
    pub fn column<'c>(&self, columns: &'c [String]) -> Option<&'c str> {
        self.keys()
            .iter()
            .find_map(|key| columns.iter().find(|column| column.eq_ignore_ascii_case(key)))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[rstest]
    #[case(json!({"skill_name": "snake", "skillName": "camel", "name": "alias"}), "snake")]
    #[case(json!({"skillName": "camel", "name": "alias"}), "camel")]
    #[case(json!({"name": "alias"}), "alias")]
    #[case(json!({"skill_name": null, "name": "alias"}), "alias")]
    fn test_lookup_precedence(#[case] value: Value, #[case] expected: &str) {
        let row = row(value);
        assert_eq!(Field::SkillName.lookup(&row), Some(&json!(expected)));
    }

    #[test]
    fn test_lookup_missing() {
        assert_eq!(Field::UseCaseEn.lookup(&row(json!({"use_case": "x"}))), None);
    }

    #[rstest]
    #[case(&["id", "skill_name", "skillName"], Some("skill_name"))]
    #[case(&["id", "Name"], Some("Name"))]
    #[case(&["id", "SKILLNAME", "title"], Some("SKILLNAME"))]
    #[case(&["id", "stars"], None)]
    fn test_column_resolution(#[case] columns: &[&str], #[case] expected: Option<&str>) {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        assert_eq!(Field::SkillName.column(&columns), expected);
    }
}
