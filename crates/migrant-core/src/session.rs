//! Database seam
//!
//! The applier talks to databases only through these traits. Backends live
//! in `migrant-store`; tests substitute scripted in-memory implementations.

use crate::errors::Result;
use crate::model::{Environment, Migration, MigrationId};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

/// Name of the applied-migrations ledger table
pub const LEDGER_TABLE: &str = "schema_migrations";

/// One row of the applied-migrations ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Migration key as written (`010`)
    pub migration_id: String,
    pub name: String,
    pub checksum: String,
    /// Unix seconds
    pub applied_at: i64,
}

impl LedgerEntry {
    pub fn for_migration(migration: &Migration, applied_at: i64) -> Self {
        Self {
            migration_id: migration.id().to_string(),
            name: migration.name().to_string(),
            checksum: migration.checksum().to_string(),
            applied_at,
        }
    }
}

/// Ledger rows keyed by numeric migration version
///
/// `10` and `010` are the same migration, so rows are matched by value rather
/// than by the key as written. Rows whose key is not numeric are skipped.
pub(crate) fn index_by_version(entries: Vec<LedgerEntry>) -> HashMap<u64, LedgerEntry> {
    entries
        .into_iter()
        .filter_map(|entry| match MigrationId::parse(&entry.migration_id) {
            Ok(id) => Some((id.version(), entry)),
            Err(_) => {
                tracing::warn!(
                    migration_id = %entry.migration_id,
                    "ignoring ledger row with a non-numeric key"
                );
                None
            }
        })
        .collect()
}

/// Opens sessions against environments
#[async_trait]
pub trait Connector: Send + Sync {
    /// Acquire a session for `environment`
    ///
    /// # Errors
    ///
    /// Returns an error if the environment is unreachable or rejects the
    /// credentials. No statement has been issued when this fails.
    async fn connect(&self, environment: &Environment) -> Result<Box<dyn Session>>;
}

/// An exclusively owned connection to one environment
///
/// Dropping a session releases the underlying connection; `close` does so
/// explicitly and reports errors.
#[async_trait]
pub trait Session: Send {
    /// Execute a migration body (one or more statements) as a unit
    ///
    /// # Errors
    ///
    /// Returns the database error when any statement fails.
    async fn execute(&mut self, body: &str) -> Result<()>;

    /// Whether the ledger table exists; never creates it
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be queried.
    async fn has_ledger(&mut self) -> Result<bool>;

    /// Create the ledger table if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created.
    async fn ensure_ledger(&mut self) -> Result<()>;

    /// Read all ledger rows
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be queried.
    async fn ledger_entries(&mut self) -> Result<Vec<LedgerEntry>>;

    /// Record a successfully applied migration
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    async fn record(&mut self, entry: &LedgerEntry) -> Result<()>;

    /// Release the connection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports a failure while closing.
    async fn close(self: Box<Self>) -> Result<()>;
}
