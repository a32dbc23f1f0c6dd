//! mt4lab CLI — batch-drive the strategy tester and convert legacy inputs.
//!
//! Commands:
//! - `run` — process every trial file in a directory through the engine
//! - `convert` — rewrite a legacy `.set` file as a structured JSON trial
//!   document

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mt4lab_core::input::{parse_set_str, trial_to_json};
use mt4lab_runner::{run_batch, BatchConfig, EngineConfig, StdoutObserver};

#[derive(Parser)]
#[command(
    name = "mt4lab",
    about = "Batch driver for the MetaTrader 4 strategy tester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every trial file in a directory through the engine.
    Run {
        /// Directory containing `.set` and `.json` trial files.
        input_dir: PathBuf,

        /// Directory for reports, audit copies, and the summary file.
        output_dir: PathBuf,

        /// Path to the engine executable.
        #[arg(long, default_value = "terminal.exe")]
        engine: PathBuf,

        /// Kill an engine run after this many seconds (no limit if omitted).
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Liveness poll interval in milliseconds.
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,
    },
    /// Rewrite a legacy flat set file as a structured JSON trial document.
    Convert {
        /// Legacy `key=value` set file.
        set_file: PathBuf,

        /// Destination JSON path.
        json_file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input_dir,
            output_dir,
            engine,
            timeout_secs,
            poll_ms,
        } => run_cmd(input_dir, output_dir, engine, timeout_secs, poll_ms),
        Commands::Convert { set_file, json_file } => convert_cmd(&set_file, &json_file),
    }
}

fn run_cmd(
    input_dir: PathBuf,
    output_dir: PathBuf,
    engine: PathBuf,
    timeout_secs: Option<u64>,
    poll_ms: u64,
) -> Result<()> {
    let config = BatchConfig {
        input_dir,
        output_dir,
        engine: EngineConfig {
            executable: engine,
            config_dir: None,
            poll_interval: Duration::from_millis(poll_ms),
            timeout: timeout_secs.map(Duration::from_secs),
        },
    };

    let outcome = run_batch(&config, &StdoutObserver)?;

    println!();
    println!(
        "Batch finished: {} completed, {} failed",
        outcome.completed.len(),
        outcome.failed.len()
    );
    if !outcome.all_succeeded() {
        for (source, error) in &outcome.failed {
            println!("  {}: {error}", source.display());
        }
    }
    println!("Summary: {}", config.summary_path().display());

    Ok(())
}

fn convert_cmd(set_file: &Path, json_file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(set_file)
        .with_context(|| format!("failed to read {}", set_file.display()))?;
    let trial = parse_set_str(&text)?;
    let json = trial_to_json(&trial)?;
    std::fs::write(json_file, json)
        .with_context(|| format!("failed to write {}", json_file.display()))?;

    println!("Converted {} -> {}", set_file.display(), json_file.display());
    Ok(())
}
