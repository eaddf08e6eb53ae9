//! Query command - export matching pages from a saved result table.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;

use routescan_core::ResultSet;

use super::{export_matches, require_queries};

/// Arguments for the query command.
#[derive(Args)]
pub struct QueryArgs {
    /// Result table written by `extract` or `run` (.csv, .json or .xlsx)
    table: PathBuf,

    /// CSV file with RouteID and LocationNumber columns
    queries: PathBuf,

    /// Directory the table's PDF paths are relative to
    #[arg(long)]
    pdf_dir: PathBuf,

    /// Directory for exported pages
    #[arg(long, default_value = "matched_pages")]
    matched_dir: PathBuf,
}

pub fn run(args: QueryArgs) -> anyhow::Result<()> {
    let queries = require_queries(&args.queries)?;

    let results = ResultSet::load(&args.table)
        .with_context(|| format!("failed to load result table {}", args.table.display()))?;
    println!(
        "{} Loaded {} records from {}",
        style("ℹ").blue(),
        results.len(),
        args.table.display()
    );

    let written = export_matches(&results, &queries, &args.pdf_dir, &args.matched_dir);

    println!();
    println!(
        "{} {} pages exported to '{}'.",
        style("✓").green(),
        written,
        args.matched_dir.display()
    );

    Ok(())
}
