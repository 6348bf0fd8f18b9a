//! Migration model
//!
//! A migration is an ordering key, a name and an opaque SQL body. Migrations
//! are immutable once built; the body checksum is computed on construction.

use crate::checksums::compute_checksum;
use crate::errors::{MigrantError, Result};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Ordering key of a migration
///
/// Parsed from the numeric prefix of a migration file (`010`, or a timestamp
/// such as `20240105120000`). Ordering, equality and hashing use the numeric
/// value; `Display` keeps the key exactly as written so `010` stays `010`.
#[derive(Debug, Clone)]
pub struct MigrationId {
    version: u64,
    key: String,
}

impl MigrationId {
    /// Parse a key made of ASCII digits
    pub fn parse(key: &str) -> Result<Self> {
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MigrantError::InvalidMigrationKey {
                key: key.to_string(),
            }
            .into());
        }
        let version = key.parse::<u64>().map_err(|_| MigrantError::InvalidMigrationKey {
            key: key.to_string(),
        })?;
        Ok(Self {
            version,
            key: key.to_string(),
        })
    }

    /// Numeric value used for ordering
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Key as written in the file name
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl PartialEq for MigrationId {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for MigrationId {}

impl PartialOrd for MigrationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MigrationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl Hash for MigrationId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state);
    }
}

impl FromStr for MigrationId {
    type Err = crate::errors::ExError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for MigrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

impl Serialize for MigrationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key)
    }
}

/// A single schema change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    id: MigrationId,
    name: String,
    body: String,
    checksum: String,
}

impl Migration {
    /// Create a migration; the checksum is derived from `body`
    pub fn new(id: MigrationId, name: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let checksum = compute_checksum(&body);
        Self {
            id,
            name: name.into(),
            body,
            checksum,
        }
    }

    pub fn id(&self) -> &MigrationId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// SQL statements, executed as one unit
    pub fn body(&self) -> &str {
        &self.body
    }

    /// SHA256 hex of the body
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// `<key>-<name>`, the way the migration is named on disk
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            format!("{}-{}", self.id, self.name)
        }
    }
}
