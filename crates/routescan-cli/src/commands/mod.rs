//! Subcommands and the helpers they share.

pub mod config;
pub mod extract;
pub mod query;
pub mod run;

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use glob::{glob_with, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use routescan_core::models::config::ScanConfig;
use routescan_core::{
    load_queries, BatchDriver, DocumentPipeline, PageExporter, Query, ResultSet, TesseractBackend,
};

/// External tool overrides, applied on top of the config file and environment.
#[derive(Args)]
pub struct EngineArgs {
    /// Tesseract executable
    #[arg(long, global = true)]
    tesseract: Option<PathBuf>,

    /// pdftoppm executable
    #[arg(long, global = true)]
    pdftoppm: Option<PathBuf>,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("routescan")
        .join("config.json")
}

/// Effective configuration: file, then environment, then flags.
///
/// Without `--config` the default config file is used if it exists.
pub fn load_config(config_path: Option<&Path>, engine: &EngineArgs) -> anyhow::Result<ScanConfig> {
    let mut config = match config_path {
        Some(path) => ScanConfig::from_file(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                ScanConfig::from_file(&default_path)?
            } else {
                ScanConfig::default()
            }
        }
    };

    config.apply_env();

    if let Some(ref path) = engine.tesseract {
        config.ocr.tesseract_path = path.clone();
    }
    if let Some(ref path) = engine.pdftoppm {
        config.pdf.pdftoppm_path = path.clone();
    }

    Ok(config)
}

pub fn require_pdf_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("PDF directory '{}' does not exist", dir.display());
    }
    Ok(())
}

/// Load the query CSV, failing when it is missing or has no valid rows.
pub fn require_queries(path: &Path) -> anyhow::Result<Vec<Query>> {
    if !path.is_file() {
        anyhow::bail!("Query CSV '{}' not found", path.display());
    }

    let queries = load_queries(path)?;
    if queries.is_empty() {
        anyhow::bail!(
            "No valid queries found in '{}'. Check the file and try again.",
            path.display()
        );
    }

    info!("Loaded {} queries from {}", queries.len(), path.display());
    Ok(queries)
}

/// Every `.pdf` file under `dir`, at any depth, matched case-insensitively.
pub fn discover_pdfs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let root = dir
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("PDF directory path is not valid UTF-8: {}", dir.display()))?;
    let pattern = format!("{}/**/*.pdf", Pattern::escape(root));

    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let files = glob_with(&pattern, options)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    Ok(files)
}

/// Run the batch over every PDF in `dir`, showing per-document progress.
pub async fn extract_directory(config: &ScanConfig, dir: &Path) -> anyhow::Result<ResultSet> {
    let files = discover_pdfs(dir)?;
    println!(
        "{} Found {} PDFs in {}",
        style("ℹ").blue(),
        files.len(),
        dir.display()
    );

    if !files.is_empty() && !TesseractBackend::new(config.ocr.clone()).is_available() {
        println!(
            "{} Could not start tesseract at '{}'. Pages will yield no records; \
             set --tesseract or ROUTESCAN_TESSERACT.",
            style("⚠").yellow(),
            config.ocr.tesseract_path.display()
        );
        warn!(
            "tesseract at {} is not available",
            config.ocr.tesseract_path.display()
        );
    }

    let pipeline = DocumentPipeline::from_config(config);
    let driver = BatchDriver::from_config(pipeline, &config.batch);
    println!(
        "{} Processing with {} workers. Please wait...",
        style("ℹ").blue(),
        driver.pool_size()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} PDFs {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let results = driver
        .run(dir, &files, |document, found| {
            pb.set_message(format!("{} ({} records)", document, found));
            pb.inc(1);
        })
        .await;

    pb.finish_with_message("done");
    Ok(results)
}

/// Print the result table for verification.
pub fn print_records(results: &ResultSet) {
    println!();
    println!("{}", style("Extracted Data:").bold());
    if results.is_empty() {
        println!("No data was extracted.");
        return;
    }

    let pdf_width = results
        .records()
        .iter()
        .map(|r| r.pdf.len())
        .max()
        .unwrap_or(0)
        .max(3);

    println!(
        "{:<8}  {:<14}  {:<30}  {:<pdf_width$}  {}",
        "RouteID", "LocationNumber", "StoreName", "PDF", "PageNumber"
    );
    for record in results.records() {
        println!(
            "{:<8}  {:<14}  {:<30}  {:<pdf_width$}  {}",
            record.route_id,
            record.location_number,
            record.store_name.replace('\n', " "),
            record.pdf,
            record.page_number
        );
    }
}

/// Export the page of every record matching a query into `matched_dir`.
///
/// Failures are reported per page; returns the number of pages written.
pub fn export_matches(
    results: &ResultSet,
    queries: &[Query],
    pdf_dir: &Path,
    matched_dir: &Path,
) -> usize {
    let exporter = PageExporter::new(matched_dir);
    let mut written = 0;

    for query in queries {
        let matches: Vec<_> = results.find(query).collect();
        if matches.is_empty() {
            println!(
                "\nRouteID '{}' with Location Number '{}' not found in any PDF.",
                query.route_id, query.location_number
            );
            info!(
                "RouteID '{}' with Location Number '{}' not found",
                query.route_id, query.location_number
            );
            continue;
        }

        println!(
            "\nRouteID '{}' with Location Number '{}' found in the following locations:",
            query.route_id, query.location_number
        );
        for record in matches {
            println!(
                "- PDF: {}, Page: {}, Store: {}",
                record.pdf, record.page_number, record.store_name
            );

            let source = pdf_dir.join(&record.pdf);
            match exporter.export(&source, record.page_number, query) {
                Ok(path) => {
                    println!("{} Saved: {}", style("✓").green(), path.display());
                    written += 1;
                }
                Err(e) => {
                    error!(
                        "Failed to extract/save page {} from {}: {}",
                        record.page_number,
                        source.display(),
                        e
                    );
                    println!(
                        "{} Error saving page {} from {}.",
                        style("✗").red(),
                        record.page_number,
                        record.pdf
                    );
                }
            }
        }
    }

    written
}
