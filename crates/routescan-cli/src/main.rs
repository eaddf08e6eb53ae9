//! CLI application for route manifest OCR.

mod commands;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use commands::{config, extract, query, run, EngineArgs};

/// Route manifest OCR - find route pages in scanned PDFs
#[derive(Parser)]
#[command(name = "routescan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose console output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Diagnostic log file, appended to on every run
    #[arg(long, global = true, default_value = "routescan.log")]
    log_file: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a directory of PDFs, then export the pages matching a query CSV
    Run(run::RunArgs),

    /// Extract a directory of PDFs into a result table
    Extract(extract::ExtractArgs),

    /// Export pages matching a query CSV from a saved result table
    Query(query::QueryArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

fn init_logging(verbose: u8, log_file: &Path) -> anyhow::Result<()> {
    let console_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let file_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_level),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(file_filter),
        )
        .try_init()?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, &cli.log_file)?;
    tracing::info!("routescan {} started", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => run::run(args, config_path, &cli.engine).await,
        Commands::Extract(args) => extract::run(args, config_path, &cli.engine).await,
        Commands::Query(args) => query::run(args),
        Commands::Config(args) => config::run(args, config_path, &cli.engine),
    };

    if let Err(ref e) = result {
        tracing::error!("{:#}", e);
    } else {
        tracing::info!("routescan finished");
    }
    result
}
