//! Layered configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file (`--config`, or `migrant.toml` in the working directory if present)
//! 3. `MIGRANT__*` environment variables, `__` separating nested keys
//!
//! ```toml
//! migrations_dir = "migrations"
//! ledger = true
//!
//! [environments.main]
//! driver = "postgres"
//! host = "db.internal"
//! database = "crm"
//! user = "crm_admin"
//!
//! [environments.dev]
//! driver = "sqlite"
//! database = "dev.db"
//! ```
//!
//! The password for `main` then comes from `MIGRANT__ENVIRONMENTS__MAIN__PASSWORD`.
//! Environment variable keys are lowercased, so environment names should be too.

use crate::connector::DriverConnector;
use crate::errors::{config_error, Result};
use ::config::{Config, Environment as EnvSource, File, FileFormat, Map};
use migrant_core::errors::{ExError, MigrantError};
use migrant_core::{ApplyOptions, ConnectionDescriptor, Environment, Mode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "migrant";
pub const ENV_PREFIX: &str = "MIGRANT";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default)]
    pub ledger: bool,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub environments: BTreeMap<String, ConnectionDescriptor>,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_parallel() -> bool {
    true
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Settings {
    /// Load from `path` (required) or the optional default file, then the process environment
    ///
    /// # Errors
    ///
    /// `Configuration` if the file is missing or any source fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Like `load`, with an explicit variable map standing in for the process environment
    ///
    /// # Errors
    ///
    /// `Configuration` if the file is missing or any source fails to parse.
    pub fn load_from(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE)
                .format(FileFormat::Toml)
                .required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                EnvSource::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error)?;

        tracing::debug!(
            migrations_dir = %settings.migrations_dir.display(),
            ledger = settings.ledger,
            environment_count = settings.environments.len(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Resolve environment names; an empty request selects every configured environment
    ///
    /// # Errors
    ///
    /// - `UnknownEnvironment` for the first name with no descriptor
    /// - `NoEnvironments` if nothing is configured or requested
    pub fn environments(&self, requested: &[String]) -> Result<Vec<Environment>> {
        if requested.is_empty() {
            if self.environments.is_empty() {
                return Err(MigrantError::NoEnvironments.into());
            }
            return Ok(self
                .environments
                .iter()
                .map(|(name, connection)| Environment::new(name.clone(), connection.clone()))
                .collect());
        }

        requested
            .iter()
            .map(|name| {
                self.environments
                    .get(name)
                    .map(|connection| Environment::new(name.clone(), connection.clone()))
                    .ok_or_else(|| {
                        ExError::from(MigrantError::UnknownEnvironment {
                            environment: name.clone(),
                            configured: self.environments.keys().cloned().collect(),
                        })
                    })
            })
            .collect()
    }

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            mode: if self.parallel {
                Mode::Parallel
            } else {
                Mode::Sequential
            },
            ledger: self.ledger,
        }
    }

    pub fn connector(&self) -> DriverConnector {
        DriverConnector::new(Duration::from_secs(self.connect_timeout_secs))
    }
}
