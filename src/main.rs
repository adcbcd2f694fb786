use anyhow::{Context, Result};
use blocking_lib::blocking::pipeline::{run_blocking, BlockingJob};
use blocking_lib::config::{BlockingConfig, ConfigOverrides};
use blocking_lib::error::failed_stage;
use blocking_lib::utils::env::load_env;
use blocking_lib::utils::get_memory_usage;
use blocking_lib::utils::progress_bars::progress_config::ProgressConfig;
use clap::Parser;
use log::{error, info};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Generate candidate merchant-name pairs by blocking",
    long_about = None
)]
struct Args {
    /// CSV file holding both merchant-name columns
    #[arg(long)]
    input: PathBuf,

    /// Column with side-1 merchant names
    #[arg(long, default_value = "Merchant_Name_1")]
    col1: String,

    /// Column with side-2 merchant names
    #[arg(long, default_value = "Merchant_Name_2")]
    col2: String,

    /// Where to write the candidate pairs
    #[arg(long, default_value = "merchant_candidate_pairs_blocked.csv")]
    output: PathBuf,

    /// Join engine: in_memory or chunked_on_disk (overrides BLOCKING_ENGINE)
    #[arg(long)]
    engine: Option<String>,

    /// Rows per ingestion batch (overrides BLOCKING_CHUNK_SIZE)
    #[arg(long, allow_hyphen_values = true)]
    chunk_size: Option<String>,

    /// Database file for the chunked engine (overrides BLOCKING_STORE_PATH)
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Let rows with an empty core block together under OTHER|
    #[arg(long)]
    join_empty_core: bool,

    /// Parser threads per batch, 0 for one per CPU (overrides BLOCKING_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// Append normalized and locality columns to the output
    #[arg(long)]
    extended_output: bool,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Free-text description recorded in the run summary
    #[arg(long)]
    description: Option<String>,
}

fn resolve_config(args: &Args) -> Result<BlockingConfig> {
    let overrides = ConfigOverrides {
        engine: args.engine.clone(),
        chunk_size: args.chunk_size.clone(),
        store_path: args.store_path.clone(),
        join_empty_core: args.join_empty_core.then_some(true),
        workers: args.workers,
        extended_output: args.extended_output.then_some(true),
    };
    let config = BlockingConfig::from_env_with(&overrides)
        .context("Failed to read blocking configuration")?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    load_env();

    let config = resolve_config(&args)?;
    config.log_config();

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );

    let job = BlockingJob {
        input: &args.input,
        column_1: &args.col1,
        column_2: &args.col2,
        output: &args.output,
        description: args.description.as_deref(),
    };
    let stats = run_blocking(&job, &config, &progress_config)?;

    info!("Blocking run {} finished", stats.run_id);
    info!(
        "  Rows: {} (side 1) / {} (side 2), {} malformed cells, {} empty cores",
        stats.total_rows_side_1,
        stats.total_rows_side_2,
        stats.malformed_cells,
        stats.empty_core_rows
    );
    info!(
        "  Candidate pairs: {} (reduction {:.4}% of the cross product)",
        stats.candidate_pairs,
        stats.reduction_ratio() * 100.0
    );
    info!(
        "  Timing: parse+ingest {:.2}s, join {:.2}s, total {:.2}s",
        stats.parse_and_ingest_time, stats.join_time, stats.total_processing_time
    );
    if progress_config.should_show_memory() {
        info!("  Memory in use: {} MB", get_memory_usage());
    }

    if let Some(path) = &args.summary_json {
        let json =
            serde_json::to_string_pretty(&stats).context("Failed to serialize run summary")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write run summary to {}", path.display()))?;
        info!("Run summary written to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting merchant-name blocking");

    let args = Args::parse();
    if let Err(e) = run(args) {
        match failed_stage(&e) {
            Some(stage) => error!("Blocking aborted at the {} stage: {:#}", stage, e),
            None => error!("Blocking aborted: {:#}", e),
        }
        std::process::exit(1);
    }
}
