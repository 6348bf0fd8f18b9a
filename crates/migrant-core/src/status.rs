//! Ledger status
//!
//! Read-only view of which migrations each environment's ledger records. The
//! ledger table is never created here; an environment without one reports
//! every migration as pending.

use crate::applier::validate_environments;
use crate::errors::{ExError, MigrantError};
use crate::model::{Environment, Migration, MigrationId};
use crate::plan::MigrationPlan;
use crate::session::{index_by_version, Connector, LedgerEntry, Session};
use crate::{log_op_end, log_op_error, log_op_start};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    Applied,
    Pending,
    /// Recorded with a checksum that no longer matches the file
    Drifted,
}

impl MigrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationState::Applied => "applied",
            MigrationState::Pending => "pending",
            MigrationState::Drifted => "drifted",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub migration_id: MigrationId,
    pub name: String,
    pub state: MigrationState,
    /// Unix seconds, when recorded
    pub applied_at: Option<i64>,
}

impl MigrationStatus {
    fn classify(migration: &Migration, recorded: Option<&LedgerEntry>) -> Self {
        let state = match recorded {
            None => MigrationState::Pending,
            Some(entry) if entry.checksum == migration.checksum() => MigrationState::Applied,
            Some(_) => MigrationState::Drifted,
        };
        Self {
            migration_id: migration.id().clone(),
            name: migration.name().to_string(),
            state,
            applied_at: recorded.map(|e| e.applied_at),
        }
    }
}

/// Ledger view of one environment
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentStatus {
    pub environment: String,
    pub target: String,
    pub migrations: Vec<MigrationStatus>,
    /// Set when the environment or its ledger could not be read
    pub error: Option<ExError>,
}

impl EnvironmentStatus {
    pub fn has_drift(&self) -> bool {
        self.migrations
            .iter()
            .any(|m| m.state == MigrationState::Drifted)
    }

    pub fn pending_count(&self) -> usize {
        self.migrations
            .iter()
            .filter(|m| m.state == MigrationState::Pending)
            .count()
    }

    /// Reachable and free of drift
    pub fn is_healthy(&self) -> bool {
        self.error.is_none() && !self.has_drift()
    }
}

/// Status of every requested environment, keyed by name
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub environments: BTreeMap<String, EnvironmentStatus>,
}

impl StatusReport {
    pub fn is_healthy(&self) -> bool {
        self.environments.values().all(EnvironmentStatus::is_healthy)
    }

    pub fn get(&self, environment: &str) -> Option<&EnvironmentStatus> {
        self.environments.get(environment)
    }
}

/// Read every environment's ledger and classify the plan against it
///
/// # Errors
///
/// `NoEnvironments` if `environments` is empty, `DuplicateEnvironment` if a
/// name appears twice. Unreachable environments are reported inside the
/// returned `StatusReport`.
pub async fn inspect<C: Connector>(
    connector: &C,
    plan: &MigrationPlan,
    environments: &[Environment],
) -> crate::errors::Result<StatusReport> {
    validate_environments(environments)?;

    let statuses = join_all(
        environments
            .iter()
            .map(|env| inspect_environment(connector, plan, env)),
    )
    .await;

    Ok(StatusReport {
        environments: statuses
            .into_iter()
            .map(|s| (s.environment.clone(), s))
            .collect(),
    })
}

async fn inspect_environment<C: Connector>(
    connector: &C,
    plan: &MigrationPlan,
    env: &Environment,
) -> EnvironmentStatus {
    log_op_start!("inspect_environment", environment = %env.name);
    let start = Instant::now();

    let mut status = EnvironmentStatus {
        environment: env.name.clone(),
        target: env.connection.to_string(),
        migrations: Vec::new(),
        error: None,
    };

    match read_ledger(connector, env).await {
        Ok(entries) => {
            status.migrations = plan
                .iter()
                .map(|m| MigrationStatus::classify(m, entries.get(&m.id().version())))
                .collect();
            log_op_end!(
                "inspect_environment",
                duration_ms = start.elapsed().as_millis() as u64,
                environment = %env.name,
                pending = status.pending_count(),
                drifted = status.has_drift()
            );
        }
        Err(error) => {
            log_op_error!(
                "inspect_environment",
                error.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                environment = %env.name
            );
            status.error = Some(error);
        }
    }

    status
}

async fn read_ledger<C: Connector>(
    connector: &C,
    env: &Environment,
) -> crate::errors::Result<HashMap<u64, LedgerEntry>> {
    let mut session = connector.connect(env).await.map_err(|source| {
        ExError::from(MigrantError::ConnectionFailed {
            environment: env.name.clone(),
            message: source.message().to_string(),
        })
        .with_source(source)
    })?;

    let result = ledger_rows(session.as_mut()).await.map_err(|source| {
        ExError::from(MigrantError::LedgerFailed {
            environment: env.name.clone(),
            message: source.message().to_string(),
        })
        .with_source(source)
    });

    if let Err(err) = session.close().await {
        tracing::warn!(environment = %env.name, error = %err, "failed to close session cleanly");
    }

    Ok(index_by_version(result?))
}

async fn ledger_rows(session: &mut dyn Session) -> crate::errors::Result<Vec<LedgerEntry>> {
    if !session.has_ledger().await? {
        return Ok(Vec::new());
    }
    session.ledger_entries().await
}
