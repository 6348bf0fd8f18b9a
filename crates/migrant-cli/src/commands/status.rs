//! Status command

use super::{load_plan, print_json, SourceArgs};
use clap::Args;
use migrant_core::{Applier, StatusReport};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Environment to inspect; repeat for several, omit for all configured
    #[arg(long = "env")]
    pub environments: Vec<String>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: StatusArgs) -> anyhow::Result<bool> {
    let settings = args.source.settings()?;
    let plan = load_plan(&settings)?;
    let environments = settings.environments(&args.environments)?;

    let applier = Applier::new(settings.connector(), settings.apply_options());
    let report = applier.status(&plan, &environments).await?;

    if args.json {
        print_json(&report)?;
    } else {
        print_text(&report);
    }
    Ok(report.is_healthy())
}

fn print_text(report: &StatusReport) {
    for env in report.environments.values() {
        println!("{} ({})", env.environment, env.target);
        if let Some(error) = &env.error {
            eprintln!("{}: {}", env.environment, error);
            println!("  unreachable: {}", error.message());
            continue;
        }
        for m in &env.migrations {
            println!("  {:<8} {}-{}", m.state.as_str(), m.migration_id, m.name);
        }
    }
}
