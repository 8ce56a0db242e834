//! Column listing command
//!
//! Usage: strata columns <TABLE>

use crate::commands::Context;
use clap::Args;

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Mapped table name
    pub table: String,
}

/// Execute columns command
pub fn execute(ctx: &Context, args: ColumnsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ctx.load_manifest()?.registry()?;
    let conn = ctx.open_db()?;

    for name in strata_engine::commands::schema::columns(&registry, &args.table, &conn)? {
        println!("{}", name);
    }

    Ok(())
}
