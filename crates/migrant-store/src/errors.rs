//! Error handling for migrant-store
//!
//! Wraps migrant-core ExError with store-specific helpers

use migrant_core::errors::{ExError, ExErrorKind, MigrantError};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a database error from sqlx::Error
///
/// Server-side errors keep only the server's message (`duplicate key value
/// violates unique constraint ...`), prefixed with the SQLSTATE when present.
pub fn from_sqlx(err: sqlx::Error) -> ExError {
    let message = match &err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => format!("{} (SQLSTATE {})", db.message(), code),
            None => db.message().to_string(),
        },
        other => other.to_string(),
    };
    ExError::new(ExErrorKind::Persistence)
        .with_op("postgres")
        .with_message(message)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    MigrantError::Io {
        op: operation.to_string(),
        message: err.to_string(),
    }
    .into()
}

/// Create a configuration error from the config crate
pub fn config_error(err: ::config::ConfigError) -> ExError {
    MigrantError::InvalidConfiguration {
        reason: err.to_string(),
    }
    .into()
}

/// A backend task died before handing its connection back
pub fn task_failed(err: tokio::task::JoinError) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("sqlite")
        .with_message(format!("blocking database task failed: {}", err))
}
