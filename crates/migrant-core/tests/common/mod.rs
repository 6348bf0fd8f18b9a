//! Scripted in-memory databases for applier tests
//!
//! Each fake database records the bodies it executed, can be made unreachable
//! or made to fail on chosen migrations, and counts session acquisitions and
//! releases.

use async_trait::async_trait;
use migrant_core::errors::{ExError, ExErrorKind, Result};
use migrant_core::{
    CancelSignal, ConnectionDescriptor, Connector, Environment, LedgerEntry, Migration,
    MigrationId, MigrationPlan, Session,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeState {
    pub unreachable: bool,
    /// Body substring -> database error text
    pub failures: HashMap<String, String>,
    /// Body substring whose execution triggers the cancel signal
    pub cancel_on: Option<(String, CancelSignal)>,
    pub executed: Vec<String>,
    pub ledger: Vec<LedgerEntry>,
    pub ledger_unreadable: bool,
    pub connects: usize,
    pub releases: usize,
}

/// Shared handle to one fake database
#[derive(Clone, Default)]
pub struct FakeDatabase(pub Arc<Mutex<FakeState>>);

#[allow(dead_code)]
impl FakeDatabase {
    pub fn unreachable(self) -> Self {
        self.0.lock().unwrap().unreachable = true;
        self
    }

    pub fn failing_on(self, body_fragment: &str, error: &str) -> Self {
        self.0
            .lock()
            .unwrap()
            .failures
            .insert(body_fragment.to_string(), error.to_string());
        self
    }

    pub fn cancelling_on(self, body_fragment: &str, signal: CancelSignal) -> Self {
        self.0.lock().unwrap().cancel_on = Some((body_fragment.to_string(), signal));
        self
    }

    pub fn with_ledger_entry(self, entry: LedgerEntry) -> Self {
        self.0.lock().unwrap().ledger.push(entry);
        self
    }

    pub fn with_unreadable_ledger(self) -> Self {
        self.0.lock().unwrap().ledger_unreadable = true;
        self
    }

    pub fn clear_failures(&self) {
        self.0.lock().unwrap().failures.clear();
    }

    pub fn executed(&self) -> Vec<String> {
        self.0.lock().unwrap().executed.clone()
    }

    pub fn ledger(&self) -> Vec<LedgerEntry> {
        self.0.lock().unwrap().ledger.clone()
    }

    pub fn connects(&self) -> usize {
        self.0.lock().unwrap().connects
    }

    pub fn releases(&self) -> usize {
        self.0.lock().unwrap().releases
    }
}

/// Connector resolving environment names to fake databases
#[derive(Default)]
pub struct FakeConnector {
    databases: HashMap<String, FakeDatabase>,
}

#[allow(dead_code)]
impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, environment: &str, database: FakeDatabase) -> Self {
        self.databases.insert(environment.to_string(), database);
        self
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, environment: &Environment) -> Result<Box<dyn Session>> {
        let database = self.databases.get(&environment.name).cloned().ok_or_else(|| {
            ExError::new(ExErrorKind::Persistence).with_message("no such host")
        })?;
        {
            let mut state = database.0.lock().unwrap();
            if state.unreachable {
                return Err(ExError::new(ExErrorKind::Persistence)
                    .with_message("connection refused"));
            }
            state.connects += 1;
        }
        Ok(Box::new(FakeSession { database }))
    }
}

pub struct FakeSession {
    database: FakeDatabase,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&mut self, body: &str) -> Result<()> {
        // Let other environments' futures interleave with this one.
        tokio::task::yield_now().await;

        let mut state = self.database.0.lock().unwrap();
        if let Some((fragment, signal)) = &state.cancel_on {
            if body.contains(fragment.as_str()) {
                signal.cancel();
            }
        }
        let failure = state
            .failures
            .iter()
            .find(|(fragment, _)| body.contains(fragment.as_str()))
            .map(|(_, error)| error.clone());
        if let Some(error) = failure {
            return Err(ExError::new(ExErrorKind::Persistence).with_message(error));
        }
        state.executed.push(body.to_string());
        Ok(())
    }

    async fn has_ledger(&mut self) -> Result<bool> {
        let state = self.database.0.lock().unwrap();
        if state.ledger_unreadable {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_message("permission denied for schema public"));
        }
        Ok(!state.ledger.is_empty())
    }

    async fn ensure_ledger(&mut self) -> Result<()> {
        if self.database.0.lock().unwrap().ledger_unreadable {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_message("permission denied for schema public"));
        }
        Ok(())
    }

    async fn ledger_entries(&mut self) -> Result<Vec<LedgerEntry>> {
        Ok(self.database.ledger())
    }

    async fn record(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.database.0.lock().unwrap().ledger.push(entry.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.database.0.lock() {
            state.releases += 1;
        }
    }
}

#[allow(dead_code)]
pub fn migration(key: &str, name: &str) -> Migration {
    Migration::new(
        MigrationId::parse(key).unwrap(),
        name,
        format!("-- {key}-{name}\nSELECT 1;"),
    )
}

#[allow(dead_code)]
pub fn plan(migrations: &[(&str, &str)]) -> MigrationPlan {
    MigrationPlan::new(
        migrations
            .iter()
            .map(|(key, name)| migration(key, name))
            .collect(),
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn environment(name: &str) -> Environment {
    Environment::new(name, ConnectionDescriptor::sqlite(format!("{name}.db")))
}

/// Migration keys of an environment's results, in order
#[allow(dead_code)]
pub fn keys(report: &migrant_core::EnvironmentReport) -> Vec<String> {
    report
        .results
        .iter()
        .map(|r| r.migration_id.to_string())
        .collect()
}
