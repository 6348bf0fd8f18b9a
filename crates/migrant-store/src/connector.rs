//! Driver dispatch
//!
//! Picks the backend from the environment's descriptor and bounds connection
//! acquisition with a timeout so an unreachable host fails the environment
//! instead of hanging the run.

use crate::errors::Result;
use crate::postgres::PostgresSession;
use crate::sqlite::SqliteSession;
use async_trait::async_trait;
use migrant_core::errors::{ExError, ExErrorKind};
use migrant_core::{Connector, Driver, Environment, Session};
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connector for every supported driver
#[derive(Debug, Clone, Copy)]
pub struct DriverConnector {
    connect_timeout: Duration,
}

impl DriverConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for DriverConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for DriverConnector {
    async fn connect(&self, environment: &Environment) -> Result<Box<dyn Session>> {
        let descriptor = &environment.connection;
        tracing::debug!(
            environment = %environment.name,
            driver = descriptor.driver.as_str(),
            target_db = %descriptor,
            "acquiring session"
        );

        let connect = async {
            let session: Box<dyn Session> = match descriptor.driver {
                Driver::Postgres => Box::new(PostgresSession::connect(descriptor).await?),
                Driver::Sqlite => Box::new(SqliteSession::open(&descriptor.database).await?),
            };
            Ok::<_, ExError>(session)
        };

        tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                ExError::new(ExErrorKind::Connectivity)
                    .with_op("connect")
                    .with_environment(environment.name.clone())
                    .with_message(format!(
                        "timed out after {}s connecting to {}",
                        self.connect_timeout.as_secs(),
                        descriptor
                    ))
            })?
    }
}
