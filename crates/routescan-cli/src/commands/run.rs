//! Run command - extract a directory and export the pages matching queries.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::error;

use super::{
    export_matches, extract_directory, load_config, print_records, require_pdf_dir,
    require_queries, EngineArgs,
};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Directory scanned recursively for PDFs
    pdf_dir: PathBuf,

    /// CSV file with RouteID and LocationNumber columns
    queries: PathBuf,

    /// Result table (.csv, .json or .xlsx)
    #[arg(short, long, default_value = "route_id_mapping.csv")]
    output: PathBuf,

    /// Directory for exported pages
    #[arg(long, default_value = "matched_pages")]
    matched_dir: PathBuf,
}

pub async fn run(
    args: RunArgs,
    config_path: Option<&Path>,
    engine: &EngineArgs,
) -> anyhow::Result<()> {
    let start = Instant::now();

    // Fail fast, before any OCR work
    require_pdf_dir(&args.pdf_dir)?;
    let queries = require_queries(&args.queries)?;
    let config = load_config(config_path, engine)?;

    let results = extract_directory(&config, &args.pdf_dir).await?;

    match results.save(&args.output) {
        Ok(()) => println!(
            "{} Results saved to {}",
            style("✓").green(),
            args.output.display()
        ),
        Err(e) => {
            error!("Error saving results to {}: {}", args.output.display(), e);
            println!(
                "{} Error saving results to {}: {}",
                style("✗").red(),
                args.output.display(),
                e
            );
        }
    }

    print_records(&results);

    let written = export_matches(&results, &queries, &args.pdf_dir, &args.matched_dir);

    println!();
    println!(
        "{} Processing complete in {:.1?}. {} pages exported to '{}'.",
        style("✓").green(),
        start.elapsed(),
        written,
        args.matched_dir.display()
    );

    Ok(())
}
