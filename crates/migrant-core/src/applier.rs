//! Migration applier
//!
//! Applies an ordered plan to a set of environments:
//! - environments are independent; a failure in one never touches another
//! - within an environment migrations run strictly in plan order
//! - the first failure in an environment ends that environment's sequence
//! - the session is released on every path
//!
//! ## Logging Ownership
//!
//! The applier owns lifecycle logging for `apply_run`, `apply_environment` and
//! `apply_migration`. Backends use only `tracing::debug!()`.

use crate::cancel::CancelSignal;
use crate::errors::{ExError, MigrantError, Result};
use crate::model::{ApplicationResult, Environment, EnvironmentReport, Migration, RunReport};
use crate::plan::MigrationPlan;
use crate::session::{index_by_version, Connector, LedgerEntry, Session};
use crate::status::{self, StatusReport};
use crate::{log_op_end, log_op_error, log_op_start};
use futures::future::join_all;
use migrant_core_types::RunId;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::Instrument;

/// How environments are scheduled relative to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Drive every environment concurrently
    #[default]
    Parallel,
    /// One environment after another, in the order given
    Sequential,
}

/// Applier options
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub mode: Mode,
    /// Consult and maintain the `schema_migrations` ledger
    pub ledger: bool,
}

/// Ledger rows keyed by migration version
type Ledger = HashMap<u64, LedgerEntry>;

/// Ordered, fail-fast, per-environment migration applier
pub struct Applier<C> {
    connector: C,
    options: ApplyOptions,
    cancel: CancelSignal,
}

impl<C: Connector> Applier<C> {
    pub fn new(connector: C, options: ApplyOptions) -> Self {
        Self {
            connector,
            options,
            cancel: CancelSignal::new(),
        }
    }

    /// Use an externally owned cancellation signal
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Apply `plan` to every environment
    ///
    /// Per-environment failures are reported inside the returned `RunReport`;
    /// only input errors that prevent any work from starting are returned as
    /// `Err`.
    ///
    /// # Errors
    ///
    /// - `NoEnvironments` if `environments` is empty
    /// - `DuplicateEnvironment` if a name appears twice
    pub async fn apply(
        &self,
        plan: &MigrationPlan,
        environments: &[Environment],
    ) -> Result<RunReport> {
        validate_environments(environments)?;

        let run_id = RunId::new();
        log_op_start!(
            "apply_run",
            run_id = %run_id,
            migration_count = plan.len(),
            environment_count = environments.len()
        );
        let start = Instant::now();

        let run_span = tracing::info_span!("apply_run", run_id = %run_id);
        let reports = match self.options.mode {
            Mode::Parallel => {
                join_all(environments.iter().map(|env| {
                    let span = tracing::info_span!(parent: &run_span, "environment", environment = %env.name);
                    self.apply_environment(plan, env).instrument(span)
                }))
                .await
            }
            Mode::Sequential => {
                let mut reports = Vec::with_capacity(environments.len());
                for env in environments {
                    let span = tracing::info_span!(parent: &run_span, "environment", environment = %env.name);
                    reports.push(self.apply_environment(plan, env).instrument(span).await);
                }
                reports
            }
        };

        let report = RunReport::new(run_id, reports);
        log_op_end!(
            "apply_run",
            duration_ms = start.elapsed().as_millis() as u64,
            run_id = %report.run_id,
            succeeded = report.is_success()
        );

        Ok(report)
    }

    /// Report each environment's ledger against `plan` without executing anything
    ///
    /// # Errors
    ///
    /// - `NoEnvironments` if `environments` is empty
    /// - `DuplicateEnvironment` if a name appears twice
    pub async fn status(
        &self,
        plan: &MigrationPlan,
        environments: &[Environment],
    ) -> Result<StatusReport> {
        status::inspect(&self.connector, plan, environments).await
    }

    async fn apply_environment(
        &self,
        plan: &MigrationPlan,
        env: &Environment,
    ) -> EnvironmentReport {
        let mut report = EnvironmentReport::new(&env.name, env.connection.to_string(), plan.len());
        log_op_start!(
            "apply_environment",
            environment = %env.name,
            target = %report.target,
            migration_count = plan.len()
        );
        let start = Instant::now();

        if self.cancel.is_cancelled() {
            report.cancelled = true;
            tracing::warn!(environment = %env.name, "run cancelled before connecting");
            return report;
        }

        let mut session = match self.connector.connect(env).await {
            Ok(session) => session,
            Err(source) => {
                let error = ExError::from(MigrantError::ConnectionFailed {
                    environment: env.name.clone(),
                    message: source.message().to_string(),
                })
                .with_migration_id(plan.first().id().to_string())
                .with_source(source);
                self.finish_with_error(&mut report, plan.first(), error, start);
                return report;
            }
        };

        let ledger = if self.options.ledger {
            match load_ledger(session.as_mut()).await {
                Ok(ledger) => Some(ledger),
                Err(source) => {
                    let error = ExError::from(MigrantError::LedgerFailed {
                        environment: env.name.clone(),
                        message: source.message().to_string(),
                    })
                    .with_migration_id(plan.first().id().to_string())
                    .with_source(source);
                    self.finish_with_error(&mut report, plan.first(), error, start);
                    release(session, &env.name).await;
                    return report;
                }
            }
        } else {
            None
        };

        for migration in plan.iter() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                tracing::warn!(
                    environment = %env.name,
                    migration_id = %migration.id(),
                    "run cancelled; remaining migrations not attempted"
                );
                break;
            }

            let result = self
                .apply_migration(session.as_mut(), env, migration, ledger.as_ref())
                .await;
            let failed = !result.is_success();
            report.results.push(result);
            if failed {
                break;
            }
        }

        release(session, &env.name).await;

        match report.failure().and_then(ApplicationResult::error) {
            Some(error) => log_op_error!(
                "apply_environment",
                error.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                environment = %env.name,
                migration_id = %error.migration_id().unwrap_or_default()
            ),
            None => log_op_end!(
                "apply_environment",
                duration_ms = start.elapsed().as_millis() as u64,
                environment = %env.name,
                applied = report.applied_count(),
                cancelled = report.cancelled
            ),
        }

        report
    }

    async fn apply_migration(
        &self,
        session: &mut dyn Session,
        env: &Environment,
        migration: &Migration,
        ledger: Option<&Ledger>,
    ) -> ApplicationResult {
        log_op_start!(
            "apply_migration",
            environment = %env.name,
            migration_id = %migration.id(),
            migration_name = migration.name()
        );
        let start = Instant::now();

        let result = match self.apply_migration_impl(session, env, migration, ledger).await {
            Ok(true) => ApplicationResult::already_applied(migration),
            Ok(false) => {
                ApplicationResult::succeeded(migration, start.elapsed().as_millis() as u64)
            }
            Err(error) => {
                log_op_error!(
                    "apply_migration",
                    error.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    environment = %env.name,
                    migration_id = %migration.id()
                );
                return ApplicationResult::failed(
                    migration,
                    error,
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        log_op_end!(
            "apply_migration",
            duration_ms = result.duration_ms,
            environment = %env.name,
            migration_id = %migration.id(),
            already_applied = result.already_applied
        );
        result
    }

    /// Returns `Ok(true)` when the ledger shows the migration already applied
    async fn apply_migration_impl(
        &self,
        session: &mut dyn Session,
        env: &Environment,
        migration: &Migration,
        ledger: Option<&Ledger>,
    ) -> Result<bool> {
        if let Some(recorded) = ledger.and_then(|l| l.get(&migration.id().version())) {
            if recorded.checksum == migration.checksum() {
                return Ok(true);
            }
            return Err(MigrantError::ChecksumMismatch {
                environment: env.name.clone(),
                migration_id: migration.id().to_string(),
                recorded: recorded.checksum.clone(),
                actual: migration.checksum().to_string(),
            }
            .into());
        }

        session.execute(migration.body()).await.map_err(|source| {
            ExError::from(MigrantError::ExecutionFailed {
                environment: env.name.clone(),
                migration_id: migration.id().to_string(),
                message: source.message().to_string(),
            })
            .with_source(source)
        })?;

        if ledger.is_some() {
            let entry = LedgerEntry::for_migration(migration, chrono::Utc::now().timestamp());
            session.record(&entry).await.map_err(|source| {
                ExError::from(MigrantError::LedgerFailed {
                    environment: env.name.clone(),
                    message: source.message().to_string(),
                })
                .with_migration_id(migration.id().to_string())
                .with_source(source)
            })?;
        }

        Ok(false)
    }

    fn finish_with_error(
        &self,
        report: &mut EnvironmentReport,
        migration: &Migration,
        error: ExError,
        start: Instant,
    ) {
        let duration_ms = start.elapsed().as_millis() as u64;
        log_op_error!(
            "apply_environment",
            error.clone(),
            duration_ms = duration_ms,
            environment = %report.environment,
            migration_id = %migration.id()
        );
        report
            .results
            .push(ApplicationResult::failed(migration, error, duration_ms));
    }
}

pub(crate) fn validate_environments(environments: &[Environment]) -> Result<()> {
    if environments.is_empty() {
        return Err(MigrantError::NoEnvironments.into());
    }
    let mut seen = HashSet::new();
    for env in environments {
        if !seen.insert(env.name.as_str()) {
            return Err(MigrantError::DuplicateEnvironment {
                environment: env.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

async fn load_ledger(session: &mut dyn Session) -> Result<Ledger> {
    session.ensure_ledger().await?;
    Ok(index_by_version(session.ledger_entries().await?))
}

async fn release(session: Box<dyn Session>, environment: &str) {
    if let Err(err) = session.close().await {
        tracing::warn!(environment, error = %err, "failed to close session cleanly");
    }
}
