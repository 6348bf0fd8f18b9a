//! migrant core - ordered, per-environment schema migration
//!
//! This crate provides the database-agnostic half of migrant:
//! - Migration and environment models, and the per-run reports
//! - Migration plan validation and selection
//! - The `Connector` / `Session` seam implemented by database backends
//! - The applier: ordered, fail-fast application per environment
//! - Read-only ledger status per environment
//! - Error and logging facilities shared by the whole workspace

pub mod applier;
pub mod cancel;
pub mod checksums;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod plan;
pub mod session;
pub mod status;

pub use migrant_core_types::schema;

// Re-export commonly used types
pub use applier::{Applier, ApplyOptions, Mode};
pub use cancel::CancelSignal;
pub use errors::{ExError, ExErrorKind, MigrantError, Result};
pub use model::{
    ApplicationResult, ConnectionDescriptor, Driver, Environment, EnvironmentReport, Migration,
    MigrationId, Outcome, RunReport,
};
pub use plan::{MigrationPlan, Selection};
pub use session::{Connector, LedgerEntry, Session};
pub use status::{EnvironmentStatus, MigrationState, MigrationStatus, StatusReport};
