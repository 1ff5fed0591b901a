//! Pentad means runner.
//!
//! Loads a run configuration, builds the pentad grid once and writes one
//! `mean_values_<source>.csv` per catalog source.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use export::SinkConfig;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use pentad_means::{load_run_config, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "pentad-means")]
#[command(about = "Per-pentad zonal means for every raster source of a catalog")]
struct Args {
    /// Run configuration (YAML)
    #[arg(short, long, env = "PENTAD_CONFIG")]
    config: PathBuf,

    /// Grid CSV, overriding `grid.path`
    #[arg(short, long)]
    grid: Option<PathBuf>,

    /// Write exports to this local folder instead of the configured sink
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only run these catalog sources (repeatable)
    #[arg(short, long = "source")]
    sources: Vec<String>,

    /// Aggregate and plan exports without writing them
    #[arg(long)]
    dry_run: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// How long shutdown waits for blocking reads that outlived their cell timeout.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout carries only the JSON summary
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(run(args));
    // Dropping the runtime would wait on every blocking task
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    outcome
}

async fn run(args: Args) -> Result<ExitCode> {
    info!(config = ?args.config, "Starting pentad-means");

    let mut config = load_run_config(&args.config)?;
    // Command-line paths are relative to the working directory, not the config
    let cwd = std::env::current_dir()?;
    if let Some(grid) = args.grid {
        config.grid.path = cwd.join(grid);
    }
    if let Some(folder) = args.output {
        config.sink = SinkConfig::Local {
            folder: cwd.join(folder),
        };
    }
    config.retain_sources(&args.sources)?;

    info!(
        sources = ?config.catalog.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        scale = config.sampling.scale,
        max_pixels = config.sampling.max_pixels,
        best_effort = config.sampling.best_effort,
        "Loaded configuration"
    );

    let pipeline = Pipeline::from_config(&config)?.with_dry_run(args.dry_run);
    let summary = pipeline.run().await;
    summary.log();
    println!("{}", summary.to_json()?);

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            failed_sources = summary.failed_sources(),
            "Run finished with failed sources"
        );
        Ok(ExitCode::FAILURE)
    }
}
