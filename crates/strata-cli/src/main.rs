//! Strata CLI
//!
//! Command-line interface for the Strata migration ledger and record mapper

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use strata_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "strata")]
#[command(about = "Strata - Schema migrations and record mapping over SQLite", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "STRATA_DB", default_value = "db/strata.sqlite3")]
    db: PathBuf,

    /// Project manifest listing models and migrations
    #[arg(long, global = true, env = "STRATA_MANIFEST", default_value = "strata.yaml")]
    manifest: PathBuf,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database tasks (migrate, rollback, status, seed)
    Db(commands::db::DbArgs),
    /// List a mapped table's columns
    Columns(commands::columns::ColumnsArgs),
}

fn main() {
    let cli = Cli::parse();

    init(match cli.log_format {
        LogFormat::Human => Profile::Development,
        LogFormat::Json => Profile::Production,
    });

    let ctx = commands::Context {
        db: cli.db,
        manifest: cli.manifest,
    };

    let result = match cli.command {
        Commands::Db(args) => commands::db::execute(&ctx, args),
        Commands::Columns(args) => commands::columns::execute(&ctx, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
