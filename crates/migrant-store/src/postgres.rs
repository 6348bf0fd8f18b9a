//! PostgreSQL backend
//!
//! One dedicated `PgConnection` per environment run. Migration bodies go over
//! the simple query protocol, so a file may hold any number of statements,
//! including `DO $$ ... $$` blocks and explicit `BEGIN; ... COMMIT;`.

use crate::errors::{from_sqlx, Result};
use crate::ledger::{CREATE_LEDGER, INSERT_LEDGER_POSTGRES, LEDGER_EXISTS_POSTGRES, SELECT_LEDGER};
use async_trait::async_trait;
use migrant_core::{ConnectionDescriptor, LedgerEntry, Session};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};

/// Build connection options from a descriptor
pub fn connect_options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(descriptor.host_or_default())
        .port(descriptor.port_or_default())
        .database(&descriptor.database)
        .application_name("migrant");
    if let Some(user) = &descriptor.user {
        options = options.username(user);
    }
    if let Some(password) = &descriptor.password {
        options = options.password(password.expose());
    }
    options
}

/// Session over one PostgreSQL connection
pub struct PostgresSession {
    conn: PgConnection,
}

impl PostgresSession {
    /// Connect using `descriptor`
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or rejects the
    /// credentials.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let conn = PgConnection::connect_with(&connect_options(descriptor))
            .await
            .map_err(from_sqlx)?;
        tracing::debug!(target_db = %descriptor, "postgres session opened");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Session for PostgresSession {
    async fn execute(&mut self, body: &str) -> Result<()> {
        tracing::debug!(bytes = body.len(), "executing migration body");
        let done = self.conn.execute(body).await.map_err(from_sqlx)?;
        tracing::debug!(rows_affected = done.rows_affected(), "migration body finished");
        Ok(())
    }

    async fn has_ledger(&mut self) -> Result<bool> {
        sqlx::query_scalar(LEDGER_EXISTS_POSTGRES)
            .fetch_one(&mut self.conn)
            .await
            .map_err(from_sqlx)
    }

    async fn ensure_ledger(&mut self) -> Result<()> {
        self.conn
            .execute(CREATE_LEDGER)
            .await
            .map(|_| ())
            .map_err(from_sqlx)
    }

    async fn ledger_entries(&mut self) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(SELECT_LEDGER)
            .fetch_all(&mut self.conn)
            .await
            .map_err(from_sqlx)?;
        Ok(rows
            .into_iter()
            .map(|(migration_id, name, checksum, applied_at)| LedgerEntry {
                migration_id,
                name,
                checksum,
                applied_at,
            })
            .collect())
    }

    async fn record(&mut self, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(INSERT_LEDGER_POSTGRES)
            .bind(&entry.migration_id)
            .bind(&entry.name)
            .bind(&entry.checksum)
            .bind(entry.applied_at)
            .execute(&mut self.conn)
            .await
            .map(|_| ())
            .map_err(from_sqlx)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await.map_err(from_sqlx)
    }
}
