//! SQLite backend
//!
//! rusqlite is blocking, so every call moves the connection onto tokio's
//! blocking pool and takes it back afterwards. Other environments' futures
//! keep running while a statement executes.

use crate::errors::{from_rusqlite, task_failed, Result};
use crate::ledger::{CREATE_LEDGER, INSERT_LEDGER_SQLITE, LEDGER_EXISTS_SQLITE, SELECT_LEDGER};
use async_trait::async_trait;
use migrant_core::errors::{ExError, ExErrorKind};
use migrant_core::{LedgerEntry, Session};
use rusqlite::Connection;

/// Open a SQLite database at the given path
pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path).map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Configure a connection the way migrations expect it
pub fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(from_rusqlite)
}

/// Session over one SQLite connection
pub struct SqliteSession {
    conn: Option<Connection>,
    path: String,
}

impl SqliteSession {
    /// Open `path` on the blocking pool
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or configured.
    pub async fn open(path: &str) -> Result<Self> {
        let owned = path.to_string();
        let conn = tokio::task::spawn_blocking(move || open(&owned))
            .await
            .map_err(task_failed)??;
        tracing::debug!(path, "sqlite session opened");
        Ok(Self {
            conn: Some(conn),
            path: path.to_string(),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut conn = self.conn.take().ok_or_else(|| {
            ExError::new(ExErrorKind::Internal)
                .with_op("sqlite")
                .with_message(format!("session for {} is no longer usable", self.path))
        })?;
        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut conn);
            (conn, result)
        })
        .await
        .map_err(task_failed)?;
        self.conn = Some(conn);
        result
    }
}

#[async_trait]
impl Session for SqliteSession {
    async fn execute(&mut self, body: &str) -> Result<()> {
        let body = body.to_string();
        tracing::debug!(path = %self.path, bytes = body.len(), "executing migration body");
        self.with_conn(move |conn| conn.execute_batch(&body).map_err(from_rusqlite))
            .await
    }

    async fn has_ledger(&mut self) -> Result<bool> {
        self.with_conn(|conn| {
            conn.query_row(LEDGER_EXISTS_SQLITE, [], |row| row.get::<_, i64>(0))
                .map(|count| count > 0)
                .map_err(from_rusqlite)
        })
        .await
    }

    async fn ensure_ledger(&mut self) -> Result<()> {
        self.with_conn(|conn| conn.execute_batch(CREATE_LEDGER).map_err(from_rusqlite))
            .await
    }

    async fn ledger_entries(&mut self) -> Result<Vec<LedgerEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(SELECT_LEDGER).map_err(from_rusqlite)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(LedgerEntry {
                        migration_id: row.get(0)?,
                        name: row.get(1)?,
                        checksum: row.get(2)?,
                        applied_at: row.get(3)?,
                    })
                })
                .map_err(from_rusqlite)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(from_rusqlite)?;
            Ok(rows)
        })
        .await
    }

    async fn record(&mut self, entry: &LedgerEntry) -> Result<()> {
        let entry = entry.clone();
        self.with_conn(move |conn| {
            conn.execute(
                INSERT_LEDGER_SQLITE,
                rusqlite::params![
                    entry.migration_id,
                    entry.name,
                    entry.checksum,
                    entry.applied_at
                ],
            )
            .map(|_| ())
            .map_err(from_rusqlite)
        })
        .await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let SqliteSession { conn, path } = *self;
        tracing::debug!(path = %path, "sqlite session closed");
        match conn {
            Some(conn) => conn.close().map_err(|(_, err)| from_rusqlite(err)),
            None => Ok(()),
        }
    }
}
