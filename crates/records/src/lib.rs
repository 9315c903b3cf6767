//! Canonical skill records.
//!
//! Skills datasets come from all sorts of scrapers and exporters, and no two
//! of them agree on column names: `skill_name`, `skillName` and `name` all
//! mean the same thing. This crate maps whatever a row looks like onto one
//! stable [`SkillRecord`] shape, and defines the query/result types the rest
//! of the workspace speaks.
//!
//! # Normalization
//! - Every canonical [`Field`] has a fixed list of candidate keys, tried in
//!   order (snake_case, camelCase, then aliases). The first non-null value
//!   wins; if nothing matches, the field gets an empty/zero default.
//! - List fields (`tags`, `tags_en`, `categories`) accept native lists, JSON
//!   lists serialized into a string, and delimited strings.
//! - `identifier` is always non-empty: explicit `id`, else the URI-encoded
//!   `skill_name`, else the 1-based row position.

mod fields;
mod list;
mod query;
mod record;

pub use crate::fields::Field;
pub use crate::list::{parse_list, pick_category};
pub use crate::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, QueryResult, QuerySpec, Sort, Summary};
pub use crate::record::{Row, SkillId, SkillRecord, encode_identifier};
