//! Loaded dataset handle.
//!
//! The dataset is distributed as a single SQLite file. SQLite can't open a
//! byte buffer directly through `sqlx`, so the bytes are written to a private
//! temporary file and opened read-only. The file lives exactly as long as the
//! [`Dataset`] does.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use skilldex_compress::Compression;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::instrument;

const SQLITE_HEADER: &[u8] = b"SQLite format 3\0";
// Queries are short and read-only; a handful of connections is plenty.
const MAX_CONNECTIONS: u32 = 4;

/// A queryable, read-only copy of the skills dataset.
#[derive(Debug)]
pub struct Dataset {
    pool: SqlitePool,
    table: String,
    columns: Vec<String>,
    // Deleted on drop. Declared after `pool` so connections go first.
    file: NamedTempFile,
}

impl Dataset {
    /// Build a dataset from raw (optionally gzip/bzip2 compressed) bytes.
    ///
    /// Fails with [`ErrorKind::ParseError`] if the bytes aren't a database,
    /// and [`ErrorKind::NoTableFound`] if the database has no user table.
    #[instrument(skip(bytes), fields(bytes = bytes.len()))]
    pub async fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut bytes = Compression::unpack(bytes).or_raise(|| ErrorKind::ParseError)?;
        if !bytes.starts_with(SQLITE_HEADER) {
            exn::bail!(ErrorKind::ParseError);
        }
        // Header bytes 18/19 are the file format write/read versions, 2 meaning
        // WAL. A WAL database can't be opened read-only without its `-shm`
        // file, which we never have. A lone database file is already fully
        // checkpointed, so flipping it to rollback mode changes nothing else.
        if bytes.get(18..20) == Some(&[2u8, 2][..]) {
            bytes[18] = 1;
            bytes[19] = 1;
        }

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut file = tempfile::Builder::new().prefix("skilldex-").suffix(".db").tempfile()?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .or_raise(|| ErrorKind::Io)?
        .or_raise(|| ErrorKind::Io)?;

        let options = SqliteConnectOptions::new().filename(file.path()).read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::ParseError)?;

        // Connecting succeeds on a lot of garbage too; the first real query
        // is what tells us whether this is a database.
        let tables = match list_tables(&pool).await {
            Ok(tables) => tables,
            Err(err) => {
                pool.close().await;
                return Err(err);
            },
        };
        let Some(table) = pick_table(&tables).map(str::to_string) else {
            pool.close().await;
            exn::bail!(ErrorKind::NoTableFound);
        };
        let columns = match list_columns(&pool, &table).await {
            Ok(columns) => columns,
            Err(err) => {
                pool.close().await;
                return Err(err);
            },
        };
        tracing::info!(%table, columns = columns.len(), "dataset loaded");
        Ok(Self {
            pool,
            table,
            columns,
            file,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The table queries run against.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column names of [`table`](Self::table), in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Close the connection pool.
    ///
    /// Queries still holding the dataset will fail after this, so only call
    /// it on a dataset nobody else references. The temporary file is removed
    /// when the dataset is dropped.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!(path = %self.file.path().display(), "dataset closed");
    }
}

async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .or_raise(|| ErrorKind::ParseError)
}

async fn list_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>> {
    sqlx::query_scalar("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await
        .or_raise(|| ErrorKind::ParseError)
}

/// Pick the table to query: `skills`, else `skill`, else the
/// lexicographically first one.
pub(crate) fn pick_table(tables: &[String]) -> Option<&str> {
    ["skills", "skill"]
        .into_iter()
        .find(|preferred| tables.iter().any(|t| t == *preferred))
        .or_else(|| tables.iter().map(String::as_str).min())
}

/// Quote an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use rstest::rstest;

    fn names(tables: &[&str]) -> Vec<String> {
        tables.iter().map(|t| t.to_string()).collect()
    }

    #[rstest]
    #[case(&["skill", "misc", "skills"], Some("skills"))]
    #[case(&["skill", "misc"], Some("skill"))]
    #[case(&["zeta", "alpha", "misc"], Some("alpha"))]
    #[case(&["Skills", "beta"], Some("Skills"))]
    #[case(&[], None)]
    fn test_pick_table(#[case] tables: &[&str], #[case] expected: Option<&str>) {
        assert_eq!(pick_table(&names(tables)), expected);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("skills"), "\"skills\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn test_discovers_preferred_table() {
        let bytes = fixture::database(&[
            "CREATE TABLE skill (id INTEGER)",
            "CREATE TABLE misc (id INTEGER)",
            "CREATE TABLE skills (id INTEGER PRIMARY KEY, skill_name TEXT, repostars INTEGER)",
        ])
        .await;
        let dataset = Dataset::from_bytes(bytes).await.unwrap();
        assert_eq!(dataset.table(), "skills");
        assert_eq!(dataset.columns(), ["id", "skill_name", "repostars"]);
        dataset.close().await;
    }

    #[rstest]
    #[case(Compression::Gzip)]
    #[case(Compression::Bzip2)]
    #[tokio::test]
    async fn test_compressed_payload(#[case] format: Compression) {
        let bytes = fixture::database(&["CREATE TABLE entries (id INTEGER)"]).await;
        let dataset = Dataset::from_bytes(format.compress(&bytes).unwrap()).await.unwrap();
        assert_eq!(dataset.table(), "entries");
    }

    #[tokio::test]
    async fn test_no_user_table() {
        let bytes = fixture::database(&["CREATE TABLE gone (id INTEGER)", "DROP TABLE gone"]).await;
        let err = Dataset::from_bytes(bytes).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NoTableFound);
    }

    #[rstest]
    #[case(b"definitely not a database".to_vec())]
    #[case(Vec::new())]
    #[case([b"SQLite format 3\0".as_slice(), &[0xff; 200]].concat())]
    #[tokio::test]
    async fn test_garbage_is_parse_error(#[case] bytes: Vec<u8>) {
        let err = Dataset::from_bytes(bytes).await.unwrap_err();
        assert_eq!(*err, ErrorKind::ParseError);
    }

    #[tokio::test]
    async fn test_column_listing_failure_is_parse_error() {
        let bytes = fixture::database(&["CREATE TABLE skills (id INTEGER)"]).await;
        let dataset = Dataset::from_bytes(bytes).await.unwrap();
        dataset.close().await;
        let err = list_columns(dataset.pool(), dataset.table()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::ParseError);
    }

    #[tokio::test]
    async fn test_temp_file_removed_on_drop() {
        let bytes = fixture::database(&["CREATE TABLE skills (id INTEGER)"]).await;
        let dataset = Dataset::from_bytes(bytes).await.unwrap();
        let path = dataset.file.path().to_path_buf();
        assert!(path.exists());
        dataset.close().await;
        drop(dataset);
        assert!(!path.exists());
    }
}
