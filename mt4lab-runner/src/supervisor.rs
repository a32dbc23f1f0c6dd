//! Engine process supervision — one run to completion with guaranteed
//! cleanup of the transient configuration artifact.
//!
//! The engine is an opaque external executable. We hand it a configuration
//! file, wait for it to exit, and report wall-clock duration. Its exit code
//! is not interpreted: a failed run surfaces downstream as a missing or
//! unreadable report.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::{Duration, Instant};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

/// How the engine is launched and waited on.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the engine executable.
    pub executable: PathBuf,
    /// Directory for transient configuration files. `None` uses the system
    /// temp directory. Each invocation gets its own uniquely named file, so
    /// runs never share a configuration path.
    pub config_dir: Option<PathBuf>,
    /// Interval between liveness checks while the engine runs.
    pub poll_interval: Duration,
    /// Kill the engine and fail the trial after this long. `None` waits
    /// indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("terminal.exe"),
            config_dir: None,
            poll_interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

/// Liveness feedback while a run is in flight.
pub trait EngineObserver {
    fn on_tick(&self, _elapsed: Duration) {}
}

/// Observer that ignores all feedback.
pub struct SilentObserver;

impl EngineObserver for SilentObserver {}

/// Outcome of a completed engine run.
#[derive(Debug, Clone, Copy)]
pub struct EngineRun {
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Errors from supervising one engine run.
#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error("failed to write engine configuration: {0}")]
    ConfigWrite(#[source] io::Error),

    #[error("failed to launch engine '{executable}': {source}")]
    Launch {
        executable: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting on the engine: {0}")]
    Wait(#[source] io::Error),

    #[error("engine exceeded the {limit_secs}s time limit and was killed")]
    Timeout { limit_secs: u64 },
}

/// Run the engine once against the given configuration text.
///
/// The configuration is written to a uniquely named temp file whose removal
/// is tied to this call's scope: success, engine failure, launch failure,
/// and timeout all delete it.
pub fn run_engine(
    config: &EngineConfig,
    ini_text: &str,
    observer: &dyn EngineObserver,
) -> Result<EngineRun, SuperviseError> {
    let config_file = write_config_file(config, ini_text).map_err(SuperviseError::ConfigWrite)?;

    let mut child = Command::new(&config.executable)
        .arg("--config")
        .arg(config_file.path())
        .spawn()
        .map_err(|source| SuperviseError::Launch {
            executable: config.executable.display().to_string(),
            source,
        })?;

    let started = Instant::now();
    let run = wait_for_exit(config, &mut child, started, observer);
    drop(config_file); // removes the transient configuration
    run
}

fn write_config_file(config: &EngineConfig, ini_text: &str) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix("mt4cfg-").suffix(".ini");
    let mut file = match &config.config_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(ini_text.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn wait_for_exit(
    config: &EngineConfig,
    child: &mut Child,
    started: Instant,
    observer: &dyn EngineObserver,
) -> Result<EngineRun, SuperviseError> {
    loop {
        if let Some(_status) = child.try_wait().map_err(SuperviseError::Wait)? {
            return Ok(EngineRun {
                elapsed: started.elapsed(),
            });
        }

        let elapsed = started.elapsed();
        if let Some(limit) = config.timeout {
            if elapsed >= limit {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SuperviseError::Timeout {
                    limit_secs: limit.as_secs(),
                });
            }
        }

        observer.on_tick(elapsed);
        std::thread::sleep(config.poll_interval);
    }
}
