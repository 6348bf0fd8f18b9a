//! migrant store - database backends, ledger, migration files, configuration
//!
//! Provides:
//! - `DriverConnector`: opens PostgreSQL (sqlx) or SQLite (rusqlite) sessions
//! - The `schema_migrations` ledger table used in ledger mode
//! - Loading ordered migrations from a directory of `<key>-<name>.sql` files
//! - Layered configuration (TOML file + `MIGRANT__*` environment variables)

pub mod connector;
pub mod errors;
pub mod ledger;
pub mod postgres;
pub mod settings;
pub mod source;
pub mod sqlite;

// Re-export key types
pub use connector::DriverConnector;
pub use settings::Settings;
pub use errors::Result;
pub use source::{load_dir, load_plan};
