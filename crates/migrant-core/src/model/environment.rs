//! Environment model
//!
//! An environment is a named deployment target (`main`, `dev`, ...) with its
//! own database. Environments are data: the applier iterates whatever set it
//! is handed.

use migrant_core_types::Sensitive;
use serde::{Deserialize, Serialize};

/// Database driver behind an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Postgres,
    Sqlite,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::Sqlite => "sqlite",
        }
    }
}

/// Everything needed to open a session against one environment
///
/// For SQLite, `database` is the file path (or `:memory:`) and the network
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionDescriptor {
    pub driver: Driver,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    pub database: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<Sensitive<String>>,
}

impl ConnectionDescriptor {
    pub const DEFAULT_POSTGRES_HOST: &'static str = "localhost";
    pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

    /// PostgreSQL descriptor with default port and no credentials
    pub fn postgres(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            driver: Driver::Postgres,
            host: Some(host.into()),
            port: None,
            database: database.into(),
            user: None,
            password: None,
        }
    }

    /// SQLite descriptor for a database file
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: Driver::Sqlite,
            host: None,
            port: None,
            database: path.into(),
            user: None,
            password: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(Sensitive::new(password.into()));
        self
    }

    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or(Self::DEFAULT_POSTGRES_HOST)
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(Self::DEFAULT_POSTGRES_PORT)
    }
}

/// Renders without the password, safe for logs and reports
impl std::fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.driver {
            Driver::Sqlite => write!(f, "sqlite://{}", self.database),
            Driver::Postgres => {
                write!(f, "postgres://")?;
                if let Some(user) = &self.user {
                    write!(f, "{}@", user)?;
                }
                write!(
                    f,
                    "{}:{}/{}",
                    self.host_or_default(),
                    self.port_or_default(),
                    self.database
                )
            }
        }
    }
}

/// A named deployment target
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub name: String,
    pub connection: ConnectionDescriptor,
}

impl Environment {
    pub fn new(name: impl Into<String>, connection: ConnectionDescriptor) -> Self {
        Self {
            name: name.into(),
            connection,
        }
    }
}
