//! Translation of a trial into the tester's `[Tester]` INI configuration.
//!
//! Literal parameters become single `Name=value` lines. Sweep parameters
//! expand into the tester's four-line range convention:
//! `Name,F=1` (range enabled), then `,1`/`,2`/`,3` for start/step/stop.

use std::path::Path;

use thiserror::Error;

use crate::trial::{ParamValue, SweepRange, TrialSpec};

/// Errors from translating a trial into configuration text.
///
/// Every variant names the offending parameter; translation stops at the
/// first bad one.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("parameter '{0}': sweep step must be non-zero")]
    ZeroStep(String),

    #[error("parameter '{name}': stepping {start} by {step} never reaches {stop}")]
    UnreachableStop {
        name: String,
        start: f64,
        step: f64,
        stop: f64,
    },

    #[error("parameter '{0}': sweep bounds must be finite")]
    NonFiniteSweep(String),

    #[error("parameter '{0}': unsupported value (expected a scalar or a start/step/stop range)")]
    UnsupportedValue(String),
}

/// Render the configuration text for one trial.
///
/// `report_path` is where the tester is told to write its report; the
/// tester appends its own extension.
pub fn translate(trial: &TrialSpec, report_path: &Path) -> Result<String, TranslateError> {
    let mut out = String::with_capacity(512);
    out.push_str("[Tester]\n");
    out.push_str(&format!("Expert={}\n", trial.advisor));
    out.push_str(&format!("Symbol={}\n", trial.symbol));
    out.push_str(&format!("Period={}\n", trial.timeframe));
    out.push_str(&format!("FromDate={}\n", trial.from_date.format("%Y.%m.%d")));
    out.push_str(&format!("ToDate={}\n", trial.to_date.format("%Y.%m.%d")));
    out.push_str(&format!("Report={}\n", report_path.display()));
    out.push_str("Model=0\n"); // 0 = every tick
    out.push_str("TestOnTick=true\n");
    out.push_str("TestGraph=true\n");

    if trial.is_optimization() {
        out.push_str("Optimization=true\n");
        out.push_str("ExpertsEnable=true\n");
    }

    for (name, value) in &trial.parameters {
        match value {
            ParamValue::Sweep(range) => {
                check_sweep(name, range)?;
                out.push_str(&format!("{name},F=1\n"));
                out.push_str(&format!("{name},1={}\n", range.start));
                out.push_str(&format!("{name},2={}\n", range.step));
                out.push_str(&format!("{name},3={}\n", range.stop));
            }
            literal => {
                let text = literal
                    .literal_text()
                    .ok_or_else(|| TranslateError::UnsupportedValue(name.clone()))?;
                out.push_str(&format!("{name}={text}\n"));
            }
        }
    }

    Ok(out)
}

fn check_sweep(name: &str, range: &SweepRange) -> Result<(), TranslateError> {
    if !range.is_finite() {
        return Err(TranslateError::NonFiniteSweep(name.to_string()));
    }
    if range.step == 0.0 {
        return Err(TranslateError::ZeroStep(name.to_string()));
    }
    if !range.reaches_stop() {
        return Err(TranslateError::UnreachableStop {
            name: name.to_string(),
            start: range.start,
            step: range.step,
            stop: range.stop,
        });
    }
    Ok(())
}
