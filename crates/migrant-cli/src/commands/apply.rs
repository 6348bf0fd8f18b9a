//! Apply command

use super::{load_plan, print_json, SourceArgs};
use clap::Args;
use migrant_core::{Applier, EnvironmentReport, Mode, RunReport, Selection};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// `all`, a migration key (`076`), or `..<key>` for everything up to it
    pub target: String,

    /// Environment to target; repeat for several, omit for all configured
    #[arg(long = "env")]
    pub environments: Vec<String>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Consult and maintain the schema_migrations ledger
    #[arg(long)]
    pub ledger: bool,

    /// Apply to environments one after another
    #[arg(long)]
    pub sequential: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ApplyArgs) -> anyhow::Result<bool> {
    let selection: Selection = args.target.parse()?;
    let settings = args.source.settings()?;
    let plan = load_plan(&settings)?.select(&selection)?;
    let environments = settings.environments(&args.environments)?;

    let mut options = settings.apply_options();
    options.ledger |= args.ledger;
    if args.sequential {
        options.mode = Mode::Sequential;
    }

    let applier = Applier::new(settings.connector(), options);
    let cancel = applier.cancel_signal().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing in-flight migrations");
            cancel.cancel();
        }
    });

    let report = applier.apply(&plan, &environments).await?;

    for failed in report.failures() {
        report_failure(failed);
    }
    if args.json {
        print_json(&report)?;
    } else {
        print_text(&report);
    }

    Ok(report.is_success())
}

fn report_failure(report: &EnvironmentReport) {
    match report.failure().and_then(|r| r.error().map(|e| (r, e))) {
        Some((result, error)) => eprintln!(
            "{}: migration {}-{} failed: {}",
            report.environment, result.migration_id, result.name, error
        ),
        None if report.cancelled => eprintln!(
            "{}: cancelled with {} migration(s) not attempted",
            report.environment,
            report.not_attempted()
        ),
        None => {}
    }
}

fn print_text(report: &RunReport) {
    println!("run {}", report.run_id);
    for env in report.environments.values() {
        println!("{} ({})", env.environment, env.target);
        for result in &env.results {
            let status = match (result.error(), result.already_applied) {
                (Some(_), _) => "FAILED ",
                (None, true) => "skipped",
                (None, false) => "ok     ",
            };
            match result.error() {
                Some(error) => println!(
                    "  {} {}-{}: {}",
                    status,
                    result.migration_id,
                    result.name,
                    error.message()
                ),
                None => println!(
                    "  {} {}-{} ({} ms)",
                    status, result.migration_id, result.name, result.duration_ms
                ),
            }
        }
        if env.not_attempted() > 0 {
            println!("  {} migration(s) not attempted", env.not_attempted());
        }
    }
    let failed = report.failures().count();
    if failed == 0 {
        println!("all {} environment(s) up to date", report.environments.len());
    } else {
        println!(
            "{} of {} environment(s) failed",
            failed,
            report.environments.len()
        );
    }
}
