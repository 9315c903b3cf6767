//! Where the skills dataset comes from.
//!
//! A [`DataSource`] is resolved from configuration, and a [`SourceBackend`]
//! built for it knows how to fetch the dataset bytes, or to prove cheaply
//! that the copy the cache already holds is still current.

pub mod backend;
pub mod error;
mod models;
mod source;

pub use crate::backend::SourceBackend;
pub use crate::models::{Fetch, Validators};
pub use crate::source::{DataSource, Locator, SourceKind, parse_remote};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn SourceBackend + Send + Sync>;
