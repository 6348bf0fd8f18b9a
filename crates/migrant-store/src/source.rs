//! Migration files
//!
//! Loads `<key>-<name>.sql` (or `<key>_<name>.sql`) files from a directory and
//! returns them in ascending key order. This loader is where ordering is
//! decided; the plan and the applier only check and follow it.

use crate::errors::{io_error, Result};
use migrant_core::errors::MigrantError;
use migrant_core::{Migration, MigrationId, MigrationPlan};
use std::path::Path;

/// Split a file name into ordering key and name
///
/// Returns `Ok(None)` for files that are not migrations (no `.sql` suffix or
/// hidden files).
///
/// # Errors
///
/// `InvalidMigrationFileName` for a `.sql` file without a numeric key.
pub fn parse_file_name(file_name: &str) -> Result<Option<(MigrationId, String)>> {
    if file_name.starts_with('.') {
        return Ok(None);
    }
    let Some(stem) = file_name.strip_suffix(".sql") else {
        return Ok(None);
    };

    let invalid = || MigrantError::InvalidMigrationFileName {
        file_name: file_name.to_string(),
    };

    let key_len = stem.bytes().take_while(u8::is_ascii_digit).count();
    if key_len == 0 {
        return Err(invalid().into());
    }
    let (key, rest) = stem.split_at(key_len);
    let name = match rest.chars().next() {
        None => "",
        Some('-') | Some('_') => &rest[1..],
        Some(_) => return Err(invalid().into()),
    };

    let id = MigrationId::parse(key).map_err(|_| invalid())?;
    Ok(Some((id, name.to_string())))
}

/// Load every migration in `dir`, sorted by key
///
/// # Errors
///
/// - `Io` if the directory or a file cannot be read
/// - `InvalidMigrationFileName` for a badly named `.sql` file
/// - `DuplicateMigration` if two files share a key
pub fn load_dir(dir: &Path) -> Result<Vec<Migration>> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_error("read_migrations_dir", e))?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_error("read_migrations_dir", e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some((id, name)) = parse_file_name(&file_name)? else {
            continue;
        };
        let body = std::fs::read_to_string(&path).map_err(|e| io_error("read_migration", e))?;
        tracing::debug!(file = %path.display(), migration_id = %id, "loaded migration");
        migrations.push(Migration::new(id, name, body));
    }

    migrations.sort_by(|a, b| a.id().cmp(b.id()));
    if let Some(pair) = migrations.windows(2).find(|pair| pair[0].id() == pair[1].id()) {
        tracing::debug!(first = %pair[0].label(), second = %pair[1].label(), "duplicate migration key");
        return Err(MigrantError::DuplicateMigration {
            migration_id: pair[1].id().to_string(),
        }
        .into());
    }

    Ok(migrations)
}

/// Load `dir` into a validated plan
///
/// # Errors
///
/// Everything `load_dir` returns, plus `EmptyMigrationSet` when the directory
/// holds no migrations.
pub fn load_plan(dir: &Path) -> Result<MigrationPlan> {
    MigrationPlan::new(load_dir(dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dash_and_underscore_names() {
        let (id, name) = parse_file_name("010-leads-created-date.sql").unwrap().unwrap();
        assert_eq!((id.as_str(), name.as_str()), ("010", "leads-created-date"));

        let (id, name) = parse_file_name("20240105120000_workers_tenant_id.sql")
            .unwrap()
            .unwrap();
        assert_eq!(id.version(), 20240105120000);
        assert_eq!(name, "workers_tenant_id");
    }

    #[test]
    fn test_parse_key_only() {
        let (id, name) = parse_file_name("042.sql").unwrap().unwrap();
        assert_eq!(id.as_str(), "042");
        assert!(name.is_empty());
    }

    #[test]
    fn test_non_migration_files_skipped() {
        assert!(parse_file_name("README.md").unwrap().is_none());
        assert!(parse_file_name(".010-hidden.sql").unwrap().is_none());
        assert!(parse_file_name("run-migrations.sh").unwrap().is_none());
    }

    #[test]
    fn test_badly_named_sql_rejected() {
        for name in ["cleanup.sql", "010a-typo.sql"] {
            let err = parse_file_name(name).unwrap_err();
            assert!(err.message().contains(name), "{}", err);
        }
    }
}
