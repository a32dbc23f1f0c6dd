//! Trial specification — the data model for one tester run.
//!
//! A trial names the expert advisor under test, the market window to replay,
//! and an ordered parameter set. Each parameter is either a literal value or
//! a [`SweepRange`] driving the tester's built-in parameter optimization.
//! Parameter order is significant: the summary file derives its column
//! layout from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Expert advisor used when bootstrapping a trial from a legacy set file.
pub const DEFAULT_ADVISOR: &str = "AcePhoenixStd3.71";
/// Symbol used when bootstrapping a trial from a legacy set file.
pub const DEFAULT_SYMBOL: &str = "EURUSD";
/// Timeframe (minutes per bar) used when bootstrapping from a legacy set file.
pub const DEFAULT_TIMEFRAME: u32 = 15;

/// A start/step/stop range for the tester's parameter sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SweepRange {
    #[serde(alias = "start")]
    pub start: f64,
    #[serde(alias = "step")]
    pub step: f64,
    #[serde(alias = "stop")]
    pub stop: f64,
}

impl SweepRange {
    /// True if stepping from `start` by `step` reaches or crosses `stop`.
    ///
    /// A zero step never reaches anything and is reported separately during
    /// translation.
    pub fn reaches_stop(&self) -> bool {
        if self.step > 0.0 {
            self.stop >= self.start
        } else if self.step < 0.0 {
            self.stop <= self.start
        } else {
            false
        }
    }

    /// True if all three bounds are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.step.is_finite() && self.stop.is_finite()
    }
}

/// One parameter value: a literal scalar or a sweep range.
///
/// Deserialization is shape-driven: a `{Start, Step, Stop}` object becomes a
/// sweep, anything else is kept as a literal. Literals that are not scalars
/// (nested objects, arrays) are rejected later, at translation time, so the
/// error can name the parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Sweep(SweepRange),
    Literal(serde_json::Value),
}

impl ParamValue {
    /// A literal string value.
    pub fn literal(text: impl Into<String>) -> Self {
        ParamValue::Literal(serde_json::Value::String(text.into()))
    }

    /// A sweep over `start..=stop` by `step`.
    pub fn sweep(start: f64, step: f64, stop: f64) -> Self {
        ParamValue::Sweep(SweepRange { start, step, stop })
    }

    pub fn is_sweep(&self) -> bool {
        matches!(self, ParamValue::Sweep(_))
    }

    /// Scalar text of a literal value, or `None` for sweeps and
    /// non-scalar literals.
    pub fn literal_text(&self) -> Option<String> {
        match self {
            ParamValue::Literal(serde_json::Value::String(s)) => Some(s.clone()),
            ParamValue::Literal(serde_json::Value::Number(n)) => Some(n.to_string()),
            ParamValue::Literal(serde_json::Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// One configured tester run.
///
/// Immutable once loaded; consumed by the pipeline exactly once. The only
/// time a trial is written back out is the audit copy stored next to an
/// optimization run's report.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSpec {
    pub advisor: String,
    pub symbol: String,
    /// Minutes per bar.
    pub timeframe: u32,
    /// Inclusive simulation window; `from_date <= to_date`.
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Stored optimization flag. Prefer [`TrialSpec::is_optimization`],
    /// which also accounts for sweep parameters.
    pub optimization: bool,
    /// Parameters in declared order.
    pub parameters: Vec<(String, ParamValue)>,
}

impl TrialSpec {
    /// A trial with the legacy bootstrap defaults and the given parameters.
    pub fn bootstrap(parameters: Vec<(String, ParamValue)>) -> Self {
        Self {
            advisor: DEFAULT_ADVISOR.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            timeframe: DEFAULT_TIMEFRAME,
            from_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date"),
            to_date: NaiveDate::from_ymd_opt(2023, 12, 31).expect("valid date"),
            optimization: false,
            parameters,
        }
    }

    pub fn has_sweeps(&self) -> bool {
        self.parameters.iter().any(|(_, v)| v.is_sweep())
    }

    /// Effective optimization mode: the stored flag, or any sweep parameter.
    pub fn is_optimization(&self) -> bool {
        self.optimization || self.has_sweeps()
    }

    /// Parameter names in declared order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// The simulation window as shown in the summary file.
    pub fn date_range_label(&self) -> String {
        format!(
            "{} - {}",
            self.from_date.format("%Y.%m.%d"),
            self.to_date.format("%Y.%m.%d")
        )
    }

    /// Non-fatal consistency findings, surfaced by the batch driver.
    pub fn validation_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.optimization && !self.has_sweeps() {
            warnings.push(
                "Optimization is enabled but no parameter declares a sweep range; \
                 the flag is passed through as-is"
                    .to_string(),
            );
        }
        warnings
    }
}
