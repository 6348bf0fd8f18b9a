//! Domain models: migrations, environments and run reports

pub mod environment;
pub mod migration;
pub mod report;

pub use environment::{ConnectionDescriptor, Driver, Environment};
pub use migration::{Migration, MigrationId};
pub use report::{ApplicationResult, EnvironmentReport, Outcome, RunReport};
