//! SQL text for the read queries.
//!
//! Identifiers come from the dataset's own schema and are quoted; user input
//! only ever travels as bound parameters.

use crate::db::quote_ident;
use skilldex_records::{Field, QuerySpec, Sort};

/// A `WHERE` clause (possibly empty) and the values to bind, in order.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Filter {
    pub(crate) clause: String,
    pub(crate) binds: Vec<String>,
}

/// `LIKE` pattern matching `input` anywhere, wildcards in `input` escaped.
pub(crate) fn contains_pattern(input: &str) -> String {
    let escaped = input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

fn like(column: &str) -> String {
    format!("{} LIKE ? ESCAPE '\\'", quote_ident(column))
}

/// Build the filter for `spec` against a table with `columns`.
///
/// Returns `None` when the query can't match anything on this table: a
/// category filter without a categories column, or a search term with no
/// searchable columns at all.
pub(crate) fn filter(spec: &QuerySpec, columns: &[String]) -> Option<Filter> {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if !spec.category.is_empty() {
        let column = Field::Categories.column(columns)?;
        clauses.push(like(column));
        binds.push(contains_pattern(&spec.category));
    }

    if !spec.q.is_empty() {
        let mut searchable: Vec<&str> = Vec::new();
        for column in Field::SEARCHABLE.iter().filter_map(|field| field.column(columns)) {
            if !searchable.contains(&column) {
                searchable.push(column);
            }
        }
        if searchable.is_empty() {
            return None;
        }
        let group: Vec<String> = searchable.iter().map(|column| like(column)).collect();
        clauses.push(format!("({})", group.join(" OR ")));
        binds.extend(std::iter::repeat_n(contains_pattern(&spec.q), searchable.len()));
    }

    let clause = match clauses.is_empty() {
        true => String::new(),
        false => format!(" WHERE {}", clauses.join(" AND ")),
    };
    Some(Filter { clause, binds })
}

/// `ORDER BY` clause for `sort`, or empty if the table has nothing to sort on.
///
/// Row id breaks ties so paging is stable.
pub(crate) fn order_by(sort: Sort, columns: &[String]) -> String {
    let primary = match sort {
        Sort::Latest => Field::UpdatedAt.column(columns).map(|c| format!("{} DESC", quote_ident(c))),
        Sort::Oldest => Field::UpdatedAt.column(columns).map(|c| format!("{} ASC", quote_ident(c))),
        // Stars are sometimes stored as text.
        Sort::Stars => Field::RepoStars.column(columns).map(|c| format!("CAST({} AS REAL) DESC", quote_ident(c))),
    };
    let tiebreak = Field::Id.column(columns).map(|c| format!("{} ASC", quote_ident(c)));
    let terms: Vec<String> = primary.into_iter().chain(tiebreak).collect();
    match terms.is_empty() {
        true => String::new(),
        false => format!(" ORDER BY {}", terms.join(", ")),
    }
}
