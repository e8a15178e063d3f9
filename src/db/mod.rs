//! Segment store: one SQLite connection, driven from async code through
//! the blocking pool.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use rusqlite::Connection;

pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use models::{AnalyzerAction, SeasonAction, Segment};

const IN_MEMORY: &str = ":memory:";

/// Cheap to clone; all clones share the connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Arc<PathBuf>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the store at `path` and bring its schema up to date.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!("WAL unavailable for {}: {err}", path.display());
        }

        Self::from_connection(conn, path)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn, PathBuf::from(IN_MEMORY))
    }

    fn from_connection(mut conn: Connection, path: PathBuf) -> Result<Self> {
        migrations::migrate(&mut conn).context("failed to migrate segment store")?;
        info!("Segment store ready at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Run `task` against the connection on the blocking pool.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            task(&mut guard)
        })
        .await
        .map_err(|err| anyhow!("database task panicked: {err}"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_is_migrated() {
        let db = Database::in_memory().unwrap();
        let version: i32 = db
            .execute(|conn| Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(version, 1);
        assert_eq!(db.path(), Path::new(IN_MEMORY));
    }

    #[tokio::test]
    async fn clones_share_one_connection() {
        let db = Database::in_memory().unwrap();
        let other = db.clone();
        db.execute(|conn| {
            conn.execute_batch("CREATE TABLE scratch (id INTEGER)")?;
            Ok(())
        })
        .await
        .unwrap();

        let exists: i64 = other
            .execute(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'scratch'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(exists, 1);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("introscan-db-{}", uuid::Uuid::new_v4()));
        let path = dir.join("introscan.sqlite3");

        let db = Database::new(path.clone()).unwrap();
        drop(db);
        let reopened = Database::new(path).unwrap();
        let tables: i64 = reopened
            .execute(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('segments', 'season_actions')",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(tables, 2);

        drop(reopened);
        let _ = std::fs::remove_dir_all(dir);
    }
}
