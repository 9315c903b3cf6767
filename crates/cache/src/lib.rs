//! In-memory cache and query engine for the skills dataset.
//!
//! The dataset is a single SQLite file, either on local disk or behind a URL.
//! This crate keeps exactly one loaded copy of it around and answers queries
//! against that copy. It is not the source of truth and never writes back:
//! if the cache is dropped, the next query simply loads the dataset again.
//!
//! # Architecture
//! - [`Dataset`]: a read-only SQLite pool over a private temporary copy of
//!   the dataset bytes, plus the table queries run against.
//! - [`CacheManager`]: owns the resident dataset, decides when it is stale,
//!   and makes sure concurrent callers share one load.
//! - [`Repository`]: list/search, lookup and summary queries, returning
//!   normalized [`SkillRecord`](skilldex_records::SkillRecord)s.

mod db;
pub mod error;
#[cfg(test)]
mod fixture;
mod manager;
mod repo;
mod sql;

pub use crate::db::Dataset;
pub use crate::manager::{CacheManager, CacheMetadata};
pub use crate::repo::Repository;
