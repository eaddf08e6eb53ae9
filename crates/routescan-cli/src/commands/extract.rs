//! Extract command - build the result table without querying it.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use super::{extract_directory, load_config, print_records, require_pdf_dir, EngineArgs};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Directory scanned recursively for PDFs
    pdf_dir: PathBuf,

    /// Result table (.csv, .json or .xlsx)
    #[arg(short, long, default_value = "route_id_mapping.csv")]
    output: PathBuf,

    /// Don't print the extracted rows
    #[arg(short, long)]
    quiet: bool,
}

pub async fn run(
    args: ExtractArgs,
    config_path: Option<&Path>,
    engine: &EngineArgs,
) -> anyhow::Result<()> {
    require_pdf_dir(&args.pdf_dir)?;
    let config = load_config(config_path, engine)?;

    let results = extract_directory(&config, &args.pdf_dir).await?;
    results.save(&args.output)?;

    if !args.quiet {
        print_records(&results);
    }

    println!();
    println!(
        "{} {} records saved to {}",
        style("✓").green(),
        results.len(),
        args.output.display()
    );

    Ok(())
}
