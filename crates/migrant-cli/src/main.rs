//! migrant CLI
//!
//! Command-line interface for applying ordered schema migrations

use clap::{Parser, Subcommand};
use migrant_core::logging_facility::{self, Profile};
use migrant_core::ExError;
use std::process::ExitCode;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "migrant")]
#[command(about = "migrant - ordered, per-environment schema migrations", long_about = None)]
struct Cli {
    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply migrations to one or more environments
    Apply(commands::apply::ApplyArgs),
    /// List migration files in order
    List(commands::list::ListArgs),
    /// Show each environment's applied-migrations ledger
    Status(commands::status::StatusArgs),
}

/// Everything succeeded
const EXIT_OK: u8 = 0;
/// An environment failed, was unreachable, drifted or was cancelled
const EXIT_FAILED: u8 = 1;
/// Configuration or input error; nothing was applied
const EXIT_INPUT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging_facility::init(if cli.log_json {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match cli.command {
        Commands::Apply(args) => commands::apply::execute(args).await,
        Commands::List(args) => commands::list::execute(args),
        Commands::Status(args) => commands::status::execute(args).await,
    };

    match result {
        Ok(true) => ExitCode::from(EXIT_OK),
        Ok(false) => ExitCode::from(EXIT_FAILED),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ExError>() {
        Some(ex) if ex.kind().is_input() => EXIT_INPUT,
        Some(ex) if ex.kind() == migrant_core::ExErrorKind::Io => EXIT_INPUT,
        Some(_) => EXIT_FAILED,
        None => EXIT_INPUT,
    }
}
