//! Whole-document persistence backends
//!
//! The memory store keeps two independent documents (memory records and the
//! dialogue context). A backend only needs to read and overwrite a named
//! document; the last successful write wins.

use crate::error::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

#[async_trait]
pub trait DocumentBackend: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Raw document body, or `None` if it was never written
    async fn read(&self, name: &str) -> Result<Option<String>>;

    /// Overwrite the whole document
    async fn write(&self, name: &str, body: &str) -> Result<()>;
}

/// One pretty-printed JSON file per document inside a directory
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a document
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl DocumentBackend for JsonFileBackend {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    /// Missing files and files that are not UTF-8 read as `None`
    async fn read(&self, name: &str) -> Result<Option<String>> {
        let bytes = match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match String::from_utf8(bytes) {
            Ok(body) => Ok(Some(body)),
            Err(e) => {
                tracing::warn!("Document '{}' is not valid UTF-8, ignoring it: {}", name, e);
                Ok(None)
            }
        }
    }

    async fn write(&self, name: &str, body: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(name), body).await?;
        Ok(())
    }
}

/// Documents stored as rows of a single SQLite table
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl SqliteBackend {
    /// Open (or create) the database file and its `documents` table
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DocumentBackend for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn read(&self, name: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT body FROM documents WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("body")?)),
            None => Ok(None),
        }
    }

    async fn write(&self, name: &str, body: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (name, body, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(body)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_backend_reads_none_before_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("memory"));

        assert_eq!(backend.read("memory").await.unwrap(), None);

        backend.write("memory", "{}").await.unwrap();
        assert_eq!(backend.read("memory").await.unwrap().as_deref(), Some("{}"));
        assert!(backend.path_for("memory").exists());
    }

    #[tokio::test]
    async fn json_backend_ignores_non_utf8_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());
        std::fs::write(backend.path_for("memory"), [0xff, 0xfe, 0x7b, 0x00, 0x80]).unwrap();

        assert_eq!(backend.read("memory").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sqlite_backend_overwrites_documents() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(dir.path().join("reverie.db")).await.unwrap();

        assert_eq!(backend.read("context").await.unwrap(), None);

        backend.write("context", "[1]").await.unwrap();
        backend.write("context", "[2]").await.unwrap();
        assert_eq!(backend.read("context").await.unwrap().as_deref(), Some("[2]"));
        assert_eq!(backend.read("memory").await.unwrap(), None);
    }
}
