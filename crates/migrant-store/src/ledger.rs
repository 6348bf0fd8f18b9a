//! Applied-migrations ledger
//!
//! One row per migration applied to an environment. The DDL is portable
//! between PostgreSQL and SQLite; only the insert differs in placeholder and
//! conflict syntax.

/// Create the ledger table if missing
pub const CREATE_LEDGER: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    migration_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    checksum TEXT NOT NULL,
    applied_at BIGINT NOT NULL
)";

/// Read every ledger row
pub const SELECT_LEDGER: &str =
    "SELECT migration_id, name, checksum, applied_at FROM schema_migrations ORDER BY migration_id";

pub const LEDGER_EXISTS_SQLITE: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'";

pub const LEDGER_EXISTS_POSTGRES: &str =
    "SELECT to_regclass('schema_migrations') IS NOT NULL";

pub const INSERT_LEDGER_SQLITE: &str = "INSERT OR IGNORE INTO schema_migrations \
     (migration_id, name, checksum, applied_at) VALUES (?1, ?2, ?3, ?4)";

pub const INSERT_LEDGER_POSTGRES: &str = "INSERT INTO schema_migrations \
     (migration_id, name, checksum, applied_at) VALUES ($1, $2, $3, $4) \
     ON CONFLICT (migration_id) DO NOTHING";
