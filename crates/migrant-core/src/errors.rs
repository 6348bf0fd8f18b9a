use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by migrant is classified by one of these kinds. Each
/// kind maps to a stable error code used by the CLI (exit codes, JSON output)
/// and by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input / configuration
    InvalidInput,
    NotFound,
    DuplicateMigration,
    Configuration,

    // Per-environment failures
    /// Environment unreachable or credentials rejected
    Connectivity,
    /// A migration body failed while executing
    Execution,
    /// Ledger records a different body checksum than the migration file has
    ChecksumMismatch,

    // Integration/IO
    Io,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::DuplicateMigration => "ERR_DUPLICATE_MIGRATION",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Connectivity => "ERR_CONNECTIVITY",
            ExErrorKind::Execution => "ERR_EXECUTION",
            ExErrorKind::ChecksumMismatch => "ERR_CHECKSUM_MISMATCH",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// True for kinds raised before any environment is contacted
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            ExErrorKind::InvalidInput
                | ExErrorKind::NotFound
                | ExErrorKind::DuplicateMigration
                | ExErrorKind::Configuration
        )
    }
}

/// Canonical structured error type
///
/// Classification fields support programmatic handling; the environment and
/// migration id pin a failure to the (migration, environment) pair it
/// happened under.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    environment: Option<String>,
    migration_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            environment: None,
            migration_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add environment context
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Add migration context
    pub fn with_migration_id(mut self, migration_id: impl Into<String>) -> Self {
        self.migration_id = Some(migration_id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the environment context, if any
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Get the migration context, if any
    pub fn migration_id(&self) -> Option<&str> {
        self.migration_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(environment) = &self.environment {
            write!(f, " (environment: {})", environment)?;
        }
        if let Some(migration_id) = &self.migration_id {
            write!(f, " (migration: {})", migration_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl Serialize for ExError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExError", 6)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("op", &self.op)?;
        state.serialize_field("environment", &self.environment)?;
        state.serialize_field("migration_id", &self.migration_id)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("source", &self.source)?;
        state.end()
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for migrant operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrantError {
    // ===== Plan Errors =====
    /// No migrations to apply
    #[error("Migration set is empty")]
    EmptyMigrationSet,

    /// Migrations are not in strictly ascending key order
    #[error("Migrations out of order: {next} follows {previous}")]
    UnorderedMigrations { previous: String, next: String },

    /// Two migrations share an ordering key
    #[error("Duplicate migration key: {migration_id}")]
    DuplicateMigration { migration_id: String },

    /// Requested migration key is not in the set
    #[error("Migration not found: {migration_id}")]
    MigrationNotFound { migration_id: String },

    /// A migration file name has no numeric ordering key
    #[error("Invalid migration file name: {file_name}")]
    InvalidMigrationFileName { file_name: String },

    /// A migration key is not a usable ordering key
    #[error("Invalid migration key: {key}")]
    InvalidMigrationKey { key: String },

    // ===== Configuration Errors =====
    /// No environments targeted
    #[error("No environments targeted")]
    NoEnvironments,

    /// The same environment was targeted twice
    #[error("Environment targeted more than once: {environment}")]
    DuplicateEnvironment { environment: String },

    /// Requested environment has no connection descriptor
    #[error("Unknown environment '{environment}' (configured: {})", .configured.join(", "))]
    UnknownEnvironment {
        environment: String,
        configured: Vec<String>,
    },

    /// Configuration could not be loaded or is incomplete
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    // ===== Per-environment Errors =====
    /// Session could not be acquired
    #[error("Cannot connect to environment {environment}: {message}")]
    ConnectionFailed {
        environment: String,
        message: String,
    },

    /// Migration body failed
    #[error("Migration {migration_id} failed on {environment}: {message}")]
    ExecutionFailed {
        environment: String,
        migration_id: String,
        message: String,
    },

    /// Ledger records a different checksum for an applied migration
    #[error("Checksum mismatch for migration {migration_id} on {environment}: recorded {recorded}, file has {actual}")]
    ChecksumMismatch {
        environment: String,
        migration_id: String,
        recorded: String,
        actual: String,
    },

    /// Ledger table could not be read or written
    #[error("Ledger operation failed on {environment}: {message}")]
    LedgerFailed {
        environment: String,
        message: String,
    },

    // ===== IO Errors =====
    /// Filesystem failure
    #[error("IO error during {op}: {message}")]
    Io { op: String, message: String },
}

impl From<MigrantError> for ExError {
    fn from(err: MigrantError) -> Self {
        let message = err.to_string();
        match err {
            MigrantError::EmptyMigrationSet
            | MigrantError::UnorderedMigrations { .. }
            | MigrantError::NoEnvironments
            | MigrantError::DuplicateEnvironment { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }

            MigrantError::InvalidMigrationFileName { .. }
            | MigrantError::InvalidMigrationKey { .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("load_migrations")
                .with_message(message),

            MigrantError::DuplicateMigration { migration_id } => {
                ExError::new(ExErrorKind::DuplicateMigration)
                    .with_migration_id(migration_id)
                    .with_message(message)
            }

            MigrantError::MigrationNotFound { migration_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_op("select_migrations")
                    .with_migration_id(migration_id)
                    .with_message(message)
            }

            MigrantError::UnknownEnvironment { environment, .. } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("resolve_environment")
                    .with_environment(environment)
                    .with_message(message)
            }

            MigrantError::InvalidConfiguration { .. } => ExError::new(ExErrorKind::Configuration)
                .with_op("load_config")
                .with_message(message),

            MigrantError::ConnectionFailed {
                environment,
                message: reason,
            } => ExError::new(ExErrorKind::Connectivity)
                .with_op("connect")
                .with_environment(environment)
                .with_message(reason),

            MigrantError::ExecutionFailed {
                environment,
                migration_id,
                message: reason,
            } => ExError::new(ExErrorKind::Execution)
                .with_op("apply_migration")
                .with_environment(environment)
                .with_migration_id(migration_id)
                .with_message(reason),

            MigrantError::ChecksumMismatch {
                environment,
                migration_id,
                ..
            } => ExError::new(ExErrorKind::ChecksumMismatch)
                .with_op("verify_ledger")
                .with_environment(environment)
                .with_migration_id(migration_id)
                .with_message(message),

            MigrantError::LedgerFailed {
                environment,
                message: reason,
            } => ExError::new(ExErrorKind::Persistence)
                .with_op("ledger")
                .with_environment(environment)
                .with_message(reason),

            MigrantError::Io { op, message: reason } => {
                ExError::new(ExErrorKind::Io).with_op(op).with_message(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_environment_kind_codes() {
        let cases = [
            (ExErrorKind::Connectivity, "ERR_CONNECTIVITY"),
            (ExErrorKind::Execution, "ERR_EXECUTION"),
            (ExErrorKind::Configuration, "ERR_CONFIGURATION"),
            (ExErrorKind::ChecksumMismatch, "ERR_CHECKSUM_MISMATCH"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_input_kinds() {
        assert!(ExErrorKind::Configuration.is_input());
        assert!(ExErrorKind::NotFound.is_input());
        assert!(!ExErrorKind::Connectivity.is_input());
        assert!(!ExErrorKind::Execution.is_input());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::Execution)
            .with_op("apply_migration")
            .with_environment("main")
            .with_migration_id("076")
            .with_message("duplicate key value");

        let text = err.to_string();
        assert!(text.starts_with("[ERR_EXECUTION]"));
        assert!(text.contains("duplicate key value"));
        assert!(text.contains("environment: main"));
        assert!(text.contains("migration: 076"));
    }

    #[test]
    fn test_source_chain() {
        let inner = ExError::new(ExErrorKind::Persistence).with_message("socket closed");
        let outer = ExError::new(ExErrorKind::Connectivity).with_source(inner);

        let source = std::error::Error::source(&outer).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("[ERR_PERSISTENCE]: socket closed"));
    }

    #[test]
    fn test_serialize_uses_stable_code() {
        let err = ExError::new(ExErrorKind::Connectivity)
            .with_environment("dev")
            .with_message("connection refused");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "ERR_CONNECTIVITY");
        assert_eq!(json["environment"], "dev");
        assert_eq!(json["message"], "connection refused");
        assert!(json["migration_id"].is_null());
    }
}
