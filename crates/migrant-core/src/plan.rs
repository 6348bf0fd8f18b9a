//! Migration plan
//!
//! A validated, ordered, non-empty sequence of migrations. The plan checks the
//! order it is given but never re-sorts: whoever assembles the list owns the
//! sequencing, which keeps it explicit and auditable.

use crate::errors::{ExError, MigrantError, Result};
use crate::model::{Migration, MigrationId};
use std::str::FromStr;

/// Which migrations of a plan to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every migration
    All,
    /// Exactly one migration
    Only(MigrationId),
    /// Every migration up to and including the given key
    Through(MigrationId),
}

/// Parses `all`, `<key>` or `..<key>`
impl FromStr for Selection {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else if let Some(key) = s.strip_prefix("..") {
            Ok(Selection::Through(MigrationId::parse(key)?))
        } else {
            Ok(Selection::Only(MigrationId::parse(s)?))
        }
    }
}

/// Ordered, non-empty set of migrations
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    migrations: Vec<Migration>,
}

impl MigrationPlan {
    /// Validate a caller-ordered list
    ///
    /// # Errors
    ///
    /// - `EmptyMigrationSet` if `migrations` is empty
    /// - `DuplicateMigration` if two migrations share a key
    /// - `UnorderedMigrations` if keys are not ascending
    pub fn new(migrations: Vec<Migration>) -> Result<Self> {
        if migrations.is_empty() {
            return Err(MigrantError::EmptyMigrationSet.into());
        }

        for pair in migrations.windows(2) {
            let (previous, next) = (pair[0].id(), pair[1].id());
            if previous == next {
                return Err(MigrantError::DuplicateMigration {
                    migration_id: next.to_string(),
                }
                .into());
            }
            if previous > next {
                return Err(MigrantError::UnorderedMigrations {
                    previous: previous.to_string(),
                    next: next.to_string(),
                }
                .into());
            }
        }

        Ok(Self { migrations })
    }

    /// Narrow the plan to a selection
    ///
    /// # Errors
    ///
    /// `MigrationNotFound` if the selection names a key that is not in the plan.
    pub fn select(&self, selection: &Selection) -> Result<MigrationPlan> {
        let selected: Vec<Migration> = match selection {
            Selection::All => self.migrations.clone(),
            Selection::Only(id) => vec![self.find(id)?.clone()],
            Selection::Through(id) => {
                self.find(id)?;
                self.migrations
                    .iter()
                    .take_while(|m| m.id() <= id)
                    .cloned()
                    .collect()
            }
        };
        MigrationPlan::new(selected)
    }

    fn find(&self, id: &MigrationId) -> Result<&Migration> {
        self.migrations
            .iter()
            .find(|m| m.id() == id)
            .ok_or_else(|| {
                MigrantError::MigrationNotFound {
                    migration_id: id.to_string(),
                }
                .into()
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.migrations.iter()
    }

    /// First migration; plans are never empty
    pub fn first(&self) -> &Migration {
        &self.migrations[0]
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}
