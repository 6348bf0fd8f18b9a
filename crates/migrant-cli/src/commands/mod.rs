//! Subcommands
//!
//! Each command returns `Ok(true)` when everything it touched is healthy,
//! `Ok(false)` when an environment failed, and `Err` for input errors that
//! stopped it before any environment was contacted.

pub mod apply;
pub mod list;
pub mod status;

use clap::Args;
use migrant_core::MigrationPlan;
use migrant_store::Settings;
use std::path::PathBuf;

/// Where configuration and migration files come from
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Configuration file (defaults to ./migrant.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Migrations directory, overriding the configured one
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

impl SourceArgs {
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(dir) = &self.dir {
            settings.migrations_dir = dir.clone();
        }
        Ok(settings)
    }
}

pub fn load_plan(settings: &Settings) -> anyhow::Result<MigrationPlan> {
    Ok(migrant_store::load_plan(&settings.migrations_dir)?)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
