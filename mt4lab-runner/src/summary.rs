//! Cross-trial summary accumulation and per-trial audit copies.
//!
//! The summary is a CSV with a fixed metric prefix followed by one column
//! per trial parameter, in the trial's declared order. The header is fixed
//! by the first trial written; a later trial with a different parameter set
//! is rejected rather than silently misaligned.
//!
//! Each append is an independent open-write-flush-close, so an interrupted
//! batch leaves a valid prefix of rows.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use mt4lab_core::input::trial_to_json;
use mt4lab_core::report::{Report, NOT_AVAILABLE};
use mt4lab_core::trial::{ParamValue, TrialSpec};

/// Fixed metric columns preceding the per-parameter columns.
pub const METRIC_COLUMNS: [&str; 9] = [
    "Set",
    "Source",
    "CCY",
    "Frequency",
    "Profit",
    "Draw Down",
    "Trades",
    "Profit Factor",
    "Backtest Dates",
];

/// Errors from the summary/audit layer.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("failed to access summary file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write summary row: {0}")]
    Csv(#[from] csv::Error),

    #[error("summary parameter columns are [{existing}] but trial declares [{declared}]")]
    HeaderMismatch { existing: String, declared: String },

    #[error("failed to write audit copy {}: {source}", .path.display())]
    Audit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize audit copy: {0}")]
    AuditJson(#[from] serde_json::Error),
}

/// Appends one row per completed trial to a shared summary CSV.
pub struct SummaryWriter {
    path: PathBuf,
}

impl SummaryWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row for `trial`, reading the four metric values out of its
    /// report. Creates the file with a header on first write; the header's
    /// parameter columns are fixed from then on. Prior rows are never
    /// rewritten or reordered.
    pub fn append(
        &self,
        run_id: &str,
        source: &str,
        trial: &TrialSpec,
        report: &Report,
    ) -> Result<(), SummaryError> {
        let declared = trial.parameter_names();

        match self.existing_parameter_columns()? {
            Some(existing) => {
                if existing.iter().map(String::as_str).ne(declared.iter().copied()) {
                    return Err(SummaryError::HeaderMismatch {
                        existing: existing.join(","),
                        declared: declared.join(","),
                    });
                }
            }
            None => self.write_header(&declared)?,
        }

        let mut record: Vec<String> = vec![
            run_id.to_string(),
            source.to_string(),
            trial.symbol.clone(),
            trial.timeframe.to_string(),
            report.net_profit(),
            report.maximal_drawdown(),
            report.total_trades(),
            report.profit_factor(),
            trial.date_range_label(),
        ];
        for (_, value) in &trial.parameters {
            record.push(parameter_cell(value));
        }

        let mut writer = csv::Writer::from_writer(self.open_append()?);
        writer.write_record(&record)?;
        writer.flush().map_err(|source| SummaryError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Parameter columns of the existing header, or `None` if the file does
    /// not exist yet (or is empty).
    fn existing_parameter_columns(&self) -> Result<Option<Vec<String>>, SummaryError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SummaryError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(text.as_bytes());
        let header = match reader.records().next() {
            Some(record) => record?,
            None => return Ok(None),
        };
        Ok(Some(
            header
                .iter()
                .skip(METRIC_COLUMNS.len())
                .map(|s| s.to_string())
                .collect(),
        ))
    }

    fn write_header(&self, parameter_names: &[&str]) -> Result<(), SummaryError> {
        let mut header: Vec<&str> = METRIC_COLUMNS.to_vec();
        header.extend_from_slice(parameter_names);

        let mut writer = csv::Writer::from_writer(self.open_append()?);
        writer.write_record(&header)?;
        writer.flush().map_err(|source| SummaryError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    fn open_append(&self) -> Result<std::fs::File, SummaryError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| SummaryError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

fn parameter_cell(value: &ParamValue) -> String {
    match value {
        ParamValue::Sweep(r) => format!("{}..{} step {}", r.start, r.stop, r.step),
        literal => literal
            .literal_text()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

/// Write the audit copy of an optimization trial next to its report.
///
/// Written before the summary row so the trial's full input (sweep ranges
/// echoed) survives even when the row append fails.
pub fn write_audit_copy(
    output_dir: &Path,
    run_id: &str,
    trial: &TrialSpec,
) -> Result<PathBuf, SummaryError> {
    let path = output_dir.join(format!("{run_id}.json"));
    let json = trial_to_json(trial)?;
    std::fs::write(&path, json).map_err(|source| SummaryError::Audit {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
