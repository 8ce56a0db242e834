//! Database task commands
//!
//! Usage: strata db <migrate|rollback|status|seed>

use crate::commands::Context;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use strata_engine::commands::db;

#[derive(Debug, Args)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Apply every pending migration
    Migrate,
    /// Roll back the most recently applied migration
    Rollback,
    /// Show applied and pending migrations
    Status(StatusArgs),
    /// Import a seed file through the mapped models
    Seed(SeedArgs),
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Path to seed YAML file
    pub path: PathBuf,
}

/// Execute db command
pub fn execute(ctx: &Context, args: DbArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = ctx.load_manifest()?;
    let mut conn = ctx.open_db()?;

    match args.command {
        DbCommand::Migrate => {
            let applied = db::migrate(&manifest.ledger()?, &mut conn)?;
            if applied.is_empty() {
                println!("Up to date");
            }
            for step in applied {
                println!("✓ Applied {} {}", step.sequence, step.name);
            }
        }
        DbCommand::Rollback => {
            let step = db::rollback(&manifest.ledger()?, &mut conn)?;
            println!("✓ Rolled back {} {}", step.sequence, step.name);
        }
        DbCommand::Status(status_args) => {
            let report = db::status(&manifest.ledger()?, &conn)?;
            if status_args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for step in &report.steps {
                    let state = match step.applied_at {
                        Some(at) => format!("applied {}", at.to_rfc3339()),
                        None => "pending".to_string(),
                    };
                    println!("{:>6}  {:<32} {}", step.sequence, step.name, state);
                }
                for drift in &report.drift {
                    println!(
                        "warning: step {} ({}) changed since it was applied",
                        drift.sequence, drift.name
                    );
                }
            }
        }
        DbCommand::Seed(seed_args) => {
            println!("Importing {}...", seed_args.path.display());
            let report = db::seed(&seed_args.path, &manifest.registry()?, &mut conn)?;
            for table in &report.tables {
                println!("  {}: {} rows", table.table, table.identities.len());
            }
            println!("✓ Imported (digest: {})", report.digest);
        }
    }

    Ok(())
}
