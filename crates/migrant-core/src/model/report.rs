//! Run reports
//!
//! An `ApplicationResult` is produced once per attempted (migration,
//! environment) pair and never changed afterwards. Migrations that were not
//! attempted have no result at all.

use crate::errors::ExError;
use crate::model::migration::{Migration, MigrationId};
use migrant_core_types::RunId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one migration on one environment
///
/// Serializes as `{"status": "succeeded"}` or
/// `{"status": "failed", "error": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed(ExError),
}

/// Result for a (migration, environment) pair
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationResult {
    pub migration_id: MigrationId,
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub duration_ms: u64,
    /// Body was not executed because the ledger already records it
    pub already_applied: bool,
}

impl ApplicationResult {
    pub fn succeeded(migration: &Migration, duration_ms: u64) -> Self {
        Self {
            migration_id: migration.id().clone(),
            name: migration.name().to_string(),
            outcome: Outcome::Succeeded,
            duration_ms,
            already_applied: false,
        }
    }

    pub fn already_applied(migration: &Migration) -> Self {
        Self {
            already_applied: true,
            ..Self::succeeded(migration, 0)
        }
    }

    pub fn failed(migration: &Migration, error: ExError, duration_ms: u64) -> Self {
        Self {
            migration_id: migration.id().clone(),
            name: migration.name().to_string(),
            outcome: Outcome::Failed(error),
            duration_ms,
            already_applied: false,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded)
    }

    pub fn error(&self) -> Option<&ExError> {
        match &self.outcome {
            Outcome::Succeeded => None,
            Outcome::Failed(err) => Some(err),
        }
    }
}

/// Ordered results for one environment
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub environment: String,
    /// Connection descriptor as displayed (never includes the password)
    pub target: String,
    /// Number of migrations the run asked for
    pub planned: usize,
    pub results: Vec<ApplicationResult>,
    /// Operator cancellation stopped the sequence early
    pub cancelled: bool,
}

impl EnvironmentReport {
    pub fn new(environment: impl Into<String>, target: impl Into<String>, planned: usize) -> Self {
        Self {
            environment: environment.into(),
            target: target.into(),
            planned,
            results: Vec::with_capacity(planned),
            cancelled: false,
        }
    }

    /// True only if every planned migration was attempted and succeeded
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.results.len() == self.planned
            && self.results.iter().all(ApplicationResult::is_success)
    }

    /// The failing result, if any (always the last entry)
    pub fn failure(&self) -> Option<&ApplicationResult> {
        self.results.last().filter(|r| !r.is_success())
    }

    /// Results that executed a body during this run
    pub fn applied_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.is_success() && !r.already_applied)
            .count()
    }

    /// Planned migrations that have no result
    pub fn not_attempted(&self) -> usize {
        self.planned - self.results.len()
    }
}

/// Per-environment reports for one run, keyed by environment name
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub environments: BTreeMap<String, EnvironmentReport>,
}

impl RunReport {
    pub fn new(run_id: RunId, reports: impl IntoIterator<Item = EnvironmentReport>) -> Self {
        let environments = reports
            .into_iter()
            .map(|r| (r.environment.clone(), r))
            .collect();
        Self {
            run_id,
            environments,
        }
    }

    pub fn is_success(&self) -> bool {
        self.environments.values().all(EnvironmentReport::is_success)
    }

    pub fn get(&self, environment: &str) -> Option<&EnvironmentReport> {
        self.environments.get(environment)
    }

    /// Environments that did not complete successfully
    pub fn failures(&self) -> impl Iterator<Item = &EnvironmentReport> {
        self.environments.values().filter(|r| !r.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    fn migration(key: &str) -> Migration {
        Migration::new(MigrationId::parse(key).unwrap(), "m", "SELECT 1;")
    }

    #[test]
    fn test_partial_run_is_not_success() {
        let mut report = EnvironmentReport::new("dev", "sqlite://dev.db", 2);
        report.results.push(ApplicationResult::succeeded(&migration("1"), 3));
        assert!(!report.is_success());
        assert_eq!(report.not_attempted(), 1);
    }

    #[test]
    fn test_cancelled_run_is_not_success() {
        let mut report = EnvironmentReport::new("dev", "sqlite://dev.db", 1);
        report.results.push(ApplicationResult::succeeded(&migration("1"), 3));
        report.cancelled = true;
        assert!(!report.is_success());
    }

    #[test]
    fn test_failure_is_last_entry() {
        let mut report = EnvironmentReport::new("main", "sqlite://main.db", 3);
        report.results.push(ApplicationResult::succeeded(&migration("1"), 1));
        report.results.push(ApplicationResult::failed(
            &migration("2"),
            ExError::new(ExErrorKind::Execution),
            1,
        ));

        let failure = report.failure().unwrap();
        assert_eq!(failure.migration_id.as_str(), "2");
        assert_eq!(report.applied_count(), 1);
    }

    #[test]
    fn test_result_json_shape() {
        let failed = ApplicationResult::failed(
            &migration("076"),
            ExError::new(ExErrorKind::Execution).with_message("duplicate key value"),
            12,
        );
        let json = serde_json::to_value(&failed).unwrap();

        assert_eq!(json["migration_id"], "076");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["code"], "ERR_EXECUTION");
        assert_eq!(json["error"]["message"], "duplicate key value");

        let ok = serde_json::to_value(ApplicationResult::succeeded(&migration("077"), 1)).unwrap();
        assert_eq!(ok["status"], "succeeded");
        assert!(ok.get("error").is_none());
    }

    #[test]
    fn test_failed_result_keeps_its_own_migration_id() {
        // The error carries no migration context; the result's key must survive
        let failed = ApplicationResult::failed(
            &migration("010"),
            ExError::new(ExErrorKind::Connectivity).with_message("connection refused"),
            0,
        );
        let text = serde_json::to_string(&failed).unwrap();

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["migration_id"], "010");
        assert!(json["error"]["migration_id"].is_null());
    }
}
