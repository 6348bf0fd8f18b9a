//! List command

use super::{load_plan, print_json, SourceArgs};
use clap::Args;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ListedMigration<'a> {
    migration_id: &'a str,
    name: &'a str,
    checksum: &'a str,
}

pub fn execute(args: ListArgs) -> anyhow::Result<bool> {
    let settings = args.source.settings()?;
    let plan = load_plan(&settings)?;

    if args.json {
        let listed: Vec<_> = plan
            .iter()
            .map(|m| ListedMigration {
                migration_id: m.id().as_str(),
                name: m.name(),
                checksum: m.checksum(),
            })
            .collect();
        print_json(&listed)?;
    } else {
        for m in plan.iter() {
            println!("{}  {}  {}", m.id(), m.name(), &m.checksum()[..12]);
        }
    }
    Ok(true)
}
