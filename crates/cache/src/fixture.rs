//! Test datasets.

use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};

/// Columns of the conventional `skills` table used throughout the tests.
pub(crate) const SKILLS_TABLE: &str = "CREATE TABLE skills (
    id INTEGER PRIMARY KEY,
    skill_name TEXT,
    tagline TEXT,
    description TEXT,
    description_en TEXT,
    use_case TEXT,
    use_case_en TEXT,
    tags TEXT,
    tags_en TEXT,
    categories TEXT,
    repostars INTEGER,
    updated_at TEXT
)";

/// Run `statements` against a fresh database file and return its bytes.
pub(crate) async fn database(statements: &[&str]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.db");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    for statement in statements {
        sqlx::query(statement).execute(&mut conn).await.unwrap();
    }
    conn.close().await.unwrap();
    std::fs::read(&path).unwrap()
}

/// Two `coding` skills with different star counts and update dates.
pub(crate) async fn alpha_beta() -> Vec<u8> {
    database(&[
        SKILLS_TABLE,
        r#"INSERT INTO skills (id, skill_name, categories, repostars, updated_at)
           VALUES (1, 'alpha', '["coding"]', 5, '2024-01-01')"#,
        r#"INSERT INTO skills (id, skill_name, categories, repostars, updated_at)
           VALUES (2, 'beta', '["coding"]', 50, '2024-02-01')"#,
    ])
    .await
}
