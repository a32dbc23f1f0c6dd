//! Batch driver — enumerate trial inputs, run each through the pipeline,
//! isolate per-trial failures.
//!
//! Trials run strictly sequentially: the engine is a stateful external
//! process that does not support concurrent instances. Any error while
//! processing one trial file is caught at the per-trial boundary and
//! reported with the offending file name; the batch continues. Only an
//! unreadable input directory aborts the whole batch.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use thiserror::Error;

use mt4lab_core::input::{load_trial, ParseError};
use mt4lab_core::report::Report;
use mt4lab_core::tester_ini::{translate, TranslateError};
use mt4lab_core::trial::TrialSpec;

use crate::summary::{write_audit_copy, SummaryError, SummaryWriter};
use crate::supervisor::{run_engine, EngineConfig, EngineObserver, SuperviseError};

/// Extensions probed for the engine-written report, in order.
const REPORT_EXTENSIONS: [&str; 2] = ["htm", "html"];

/// The per-trial error union, caught at the batch boundary.
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("trial input: {0}")]
    Parse(#[from] ParseError),

    #[error("configuration translation: {0}")]
    Translate(#[from] TranslateError),

    #[error("engine run: {0}")]
    Supervise(#[from] SuperviseError),

    #[error("summary: {0}")]
    Summary(#[from] SummaryError),
}

/// Batch-fatal errors.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read input directory {}: {source}", .dir.display())]
    InputDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output directory {}: {source}", .dir.display())]
    OutputDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Batch-level progress callbacks.
///
/// All methods default to no-ops so observers implement only what they
/// display.
pub trait BatchObserver {
    fn on_trial_start(&self, _source: &Path, _index: usize, _total: usize) {}
    fn on_trial_warning(&self, _source: &Path, _warning: &str) {}
    fn on_engine_tick(&self, _elapsed: Duration) {}
    fn on_trial_complete(&self, _source: &Path, _run_id: &str, _elapsed: Duration) {}
    fn on_trial_failed(&self, _source: &Path, _error: &TrialError) {}
}

/// Observer that ignores all feedback.
pub struct QuietObserver;

impl BatchObserver for QuietObserver {}

/// Observer printing progress the way the interactive CLI expects it.
pub struct StdoutObserver;

impl BatchObserver for StdoutObserver {
    fn on_trial_start(&self, source: &Path, index: usize, total: usize) {
        println!("[{}/{}] {}", index + 1, total, source.display());
    }

    fn on_trial_warning(&self, source: &Path, warning: &str) {
        eprintln!("WARNING: {}: {warning}", source.display());
    }

    fn on_engine_tick(&self, elapsed: Duration) {
        print!("\rElapsed time: {}", format_hms(elapsed));
        let _ = io::stdout().flush();
    }

    fn on_trial_complete(&self, _source: &Path, run_id: &str, elapsed: Duration) {
        println!("\nCompleted {run_id} in {}", format_hms(elapsed));
    }

    fn on_trial_failed(&self, source: &Path, error: &TrialError) {
        eprintln!("Error processing {}: {error}", source.display());
    }
}

/// `hh:mm:ss` rendering of an elapsed duration.
pub fn format_hms(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// One completed trial.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub source: PathBuf,
    pub run_id: String,
    pub elapsed: Duration,
}

/// Results of a whole batch run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub completed: Vec<TrialOutcome>,
    pub failed: Vec<(PathBuf, TrialError)>,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory holding `.set` and `.json` trial files.
    pub input_dir: PathBuf,
    /// Directory for reports, audit copies, and the summary file.
    pub output_dir: PathBuf,
    pub engine: EngineConfig,
}

impl BatchConfig {
    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("summary.csv")
    }
}

/// Run every trial file in the input directory, sequentially.
///
/// Processing order follows directory enumeration order, which is
/// OS-dependent.
pub fn run_batch(
    config: &BatchConfig,
    observer: &dyn BatchObserver,
) -> Result<BatchOutcome, BatchError> {
    let read_err = |source| BatchError::InputDir {
        dir: config.input_dir.clone(),
        source,
    };

    let mut inputs: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(&config.input_dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if is_trial_input(&path) {
            inputs.push(path);
        }
    }

    fs::create_dir_all(&config.output_dir).map_err(|source| BatchError::OutputDir {
        dir: config.output_dir.clone(),
        source,
    })?;

    let summary = SummaryWriter::new(config.summary_path());
    let mut outcome = BatchOutcome::default();
    let total = inputs.len();

    for (index, source) in inputs.iter().enumerate() {
        observer.on_trial_start(source, index, total);
        match run_trial(config, &summary, source, observer) {
            Ok(trial_outcome) => {
                observer.on_trial_complete(source, &trial_outcome.run_id, trial_outcome.elapsed);
                outcome.completed.push(trial_outcome);
            }
            Err(error) => {
                observer.on_trial_failed(source, &error);
                outcome.failed.push((source.clone(), error));
            }
        }
    }

    Ok(outcome)
}

fn is_trial_input(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.eq_ignore_ascii_case("set") || ext.eq_ignore_ascii_case("json"),
        None => false,
    }
}

fn run_trial(
    config: &BatchConfig,
    summary: &SummaryWriter,
    source: &Path,
    observer: &dyn BatchObserver,
) -> Result<TrialOutcome, TrialError> {
    let trial = load_trial(source)?;
    for warning in trial.validation_warnings() {
        observer.on_trial_warning(source, &warning);
    }

    let run_id = make_run_id(&trial);
    let report_path = config.output_dir.join(&run_id);
    let ini = translate(&trial, &report_path)?;

    let ticks = TickForward(observer);
    let run = run_engine(&config.engine, &ini, &ticks)?;

    if trial.is_optimization() {
        write_audit_copy(&config.output_dir, &run_id, &trial)?;
    }

    let report = read_report(&report_path);
    let source_label = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());
    summary.append(&run_id, &source_label, &trial, &report)?;

    Ok(TrialOutcome {
        source: source.to_path_buf(),
        run_id,
        elapsed: run.elapsed,
    })
}

/// Report stem: `{advisor}-{symbol}-{timeframe}-{timestamp}`.
fn make_run_id(trial: &TrialSpec) -> String {
    format!(
        "{}-{}-{}-{}",
        trial.advisor,
        trial.symbol,
        trial.timeframe,
        Local::now().format("%Y%m%d%H%M%S")
    )
}

/// Read the engine's report, probing the extensions it is known to use.
/// A missing or unreadable report degrades to an empty document, which in
/// turn degrades every metric lookup to the sentinel.
///
/// The extension is appended, not substituted: run ids routinely contain
/// dots (advisor names like `AcePhoenixStd3.71`).
fn read_report(report_path: &Path) -> Report {
    for ext in REPORT_EXTENSIONS {
        let mut candidate = report_path.as_os_str().to_os_string();
        candidate.push(".");
        candidate.push(ext);
        if let Ok(text) = fs::read_to_string(Path::new(&candidate)) {
            return Report::parse(&text);
        }
    }
    Report::parse("")
}

struct TickForward<'a>(&'a dyn BatchObserver);

impl EngineObserver for TickForward<'_> {
    fn on_tick(&self, elapsed: Duration) {
        self.0.on_engine_tick(elapsed);
    }
}
