//! Read queries over the cached dataset.
//!
//! Every operation first asks the [`CacheManager`] for a ready dataset. If
//! there is none (first load failed) that error is returned, except for a
//! database without any table, which answers every query with nothing. Once
//! a dataset is in hand, a failing query is logged and degrades to an empty
//! answer: an odd dataset is still a dataset.

use crate::db::{Dataset, quote_ident};
use crate::error::{ErrorKind, Result};
use crate::manager::CacheManager;
use crate::sql;
use exn::ResultExt;
use serde_json::{Number, Value};
use skilldex_records::{Field, QueryResult, QuerySpec, Row, SkillRecord, Summary, pick_category};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Skill queries, answered from whatever dataset the cache holds.
#[derive(Clone)]
pub struct Repository {
    cache: CacheManager,
}
impl Repository {
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    /// The dataset to query, or `None` when it has no table to query.
    async fn dataset(&self) -> Result<Option<Arc<Dataset>>> {
        match self.cache.dataset().await {
            Ok(dataset) => Ok(Some(dataset)),
            Err(err) if matches!(&*err, ErrorKind::NoTableFound) => {
                tracing::warn!(error = ?err, "dataset has no table, answering with nothing");
                Ok(None)
            },
            Err(err) => Err(err),
        }
    }

    /// Search, filter, sort and paginate.
    ///
    /// The query is [clamped](QuerySpec::clamped) first; the result echoes
    /// the effective page and page size.
    #[instrument(skip(self))]
    pub async fn list(&self, spec: QuerySpec) -> Result<QueryResult> {
        let spec = spec.clamped();
        let Some(dataset) = self.dataset().await? else {
            return Ok(QueryResult::empty(&spec));
        };
        match list(&dataset, &spec).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::warn!(error = ?err, "listing skills failed, returning no results");
                Ok(QueryResult::empty(&spec))
            },
        }
    }

    /// Look up one skill by its `identifier`.
    ///
    /// The identifier is URL-decoded. All digits means a lookup by `id`,
    /// anything else an exact match on the skill name.
    #[instrument(skip(self))]
    pub async fn get_by_identifier(&self, identifier: &str) -> Result<Option<SkillRecord>> {
        let Some(dataset) = self.dataset().await? else {
            return Ok(None);
        };
        match get_by_identifier(&dataset, identifier).await {
            Ok(record) => Ok(record),
            Err(err) => {
                tracing::warn!(error = ?err, "skill lookup failed, treating as not found");
                Ok(None)
            },
        }
    }

    /// Row count and per-category histogram.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<Summary> {
        let Some(dataset) = self.dataset().await? else {
            return Ok(Summary::default());
        };
        match summary(&dataset).await {
            Ok(summary) => Ok(summary),
            Err(err) => {
                tracing::warn!(error = ?err, "summarizing skills failed, returning an empty summary");
                Ok(Summary::default())
            },
        }
    }
}

async fn list(dataset: &Dataset, spec: &QuerySpec) -> Result<QueryResult> {
    let Some(filter) = sql::filter(spec, dataset.columns()) else {
        return Ok(QueryResult::empty(spec));
    };
    let table = quote_ident(dataset.table());

    let count_sql = format!("SELECT COUNT(*) FROM {table}{}", filter.clause);
    let mut count = sqlx::query_scalar::<Sqlite, i64>(&count_sql);
    for bind in &filter.binds {
        count = count.bind(bind.as_str());
    }
    let total = count.fetch_one(dataset.pool()).await.or_raise(|| ErrorKind::Database)?;

    let offset = spec.offset();
    let select_sql = format!(
        "SELECT * FROM {table}{}{} LIMIT ? OFFSET ?",
        filter.clause,
        sql::order_by(spec.sort, dataset.columns())
    );
    let mut select = sqlx::query::<Sqlite>(&select_sql);
    for bind in &filter.binds {
        select = select.bind(bind.as_str());
    }
    let rows = select
        .bind(i64::from(spec.page_size))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(dataset.pool())
        .await
        .or_raise(|| ErrorKind::Database)?;

    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let items = rows
        .iter()
        .enumerate()
        .map(|(i, row)| SkillRecord::from_row(&to_json(row), start.saturating_add(i)))
        .collect();
    Ok(QueryResult {
        items,
        total: u64::try_from(total).unwrap_or_default(),
        page: spec.page,
        page_size: spec.page_size,
    })
}

async fn get_by_identifier(dataset: &Dataset, identifier: &str) -> Result<Option<SkillRecord>> {
    let decoded = urlencoding::decode(identifier).map(|s| s.into_owned()).unwrap_or_else(|_| identifier.to_string());
    let all_digits = !decoded.is_empty() && decoded.bytes().all(|b| b.is_ascii_digit());
    let table = quote_ident(dataset.table());
    let columns = dataset.columns();

    let row = match (all_digits, Field::Id.column(columns), Field::SkillName.column(columns)) {
        (true, Some(column), _) => {
            let sql = format!("SELECT * FROM {table} WHERE {} = ? LIMIT 1", quote_ident(column));
            let query = sqlx::query::<Sqlite>(&sql);
            // Too big for an integer id; compared as text it matches nothing numeric.
            let query = match decoded.parse::<i64>() {
                Ok(id) => query.bind(id),
                Err(_) => query.bind(decoded.as_str()),
            };
            query.fetch_optional(dataset.pool()).await
        },
        (_, _, Some(column)) => {
            let sql = format!("SELECT * FROM {table} WHERE {} = ? LIMIT 1", quote_ident(column));
            sqlx::query::<Sqlite>(&sql)
                .bind(decoded.as_str())
                .fetch_optional(dataset.pool())
                .await
        },
        _ => return Ok(None),
    }
    .or_raise(|| ErrorKind::Database)?;
    Ok(row.map(|row| SkillRecord::from_row(&to_json(&row), 0)))
}

async fn summary(dataset: &Dataset) -> Result<Summary> {
    let table = quote_ident(dataset.table());
    let Some(column) = Field::Categories.column(dataset.columns()) else {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(dataset.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        return Ok(Summary {
            total: u64::try_from(total).unwrap_or_default(),
            counts: BTreeMap::new(),
        });
    };
    let rows = sqlx::query(&format!("SELECT {} FROM {table}", quote_ident(column)))
        .fetch_all(dataset.pool())
        .await
        .or_raise(|| ErrorKind::Database)?;
    let mut counts = BTreeMap::new();
    for row in &rows {
        let category = pick_category(Some(&column_value(row, 0)));
        if !category.is_empty() {
            *counts.entry(category).or_insert(0) += 1;
        }
    }
    Ok(Summary {
        total: rows.len() as u64,
        counts,
    })
}

/// Convert a row to JSON, column by column, keeping SQLite's storage class.
fn to_json(row: &SqliteRow) -> Row {
    row.columns().iter().map(|column| (column.name().to_string(), column_value(row, column.ordinal()))).collect()
}

fn column_value(row: &SqliteRow, index: usize) -> Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    // SQLite is dynamically typed: go by what is stored, not what the
    // column was declared as.
    match raw.type_info().name() {
        "INTEGER" => row.try_get_unchecked::<i64, _>(index).map(Value::from).unwrap_or(Value::Null),
        "REAL" => row
            .try_get_unchecked::<f64, _>(index)
            .ok()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String).unwrap_or(Value::Null),
    }
}
