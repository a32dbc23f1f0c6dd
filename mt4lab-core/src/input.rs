//! Trial input loading — legacy flat set files and structured JSON documents.
//!
//! Two source shapes are accepted:
//! - Legacy `.set` files: one `key=value` parameter per line. These carry no
//!   advisor/window information, so they bootstrap a trial with the fixed
//!   legacy defaults and the file's parameters merged in declared order.
//! - Structured `.json` trial documents: the full [`TrialSpec`], PascalCase
//!   keys, sweep ranges as `{Start, Step, Stop}` objects.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::trial::{ParamValue, TrialSpec};

/// Errors from loading a trial file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed trial document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),

    #[error("invalid simulation window: from {from} is after to {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("unsupported trial file extension: {}", .0.display())]
    UnsupportedExtension(PathBuf),
}

/// Load a trial from a file, dispatching on the `.set`/`.json` extension.
pub fn load_trial(path: &Path) -> Result<TrialSpec, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("set") => parse_set_str(&text),
        Some(ext) if ext.eq_ignore_ascii_case("json") => parse_trial_json(&text),
        _ => Err(ParseError::UnsupportedExtension(path.to_path_buf())),
    }
}

/// Parse a legacy flat set file into a bootstrapped trial.
///
/// Only lines with exactly one `=` contribute a parameter; everything else
/// is ignored. Declared order is preserved. A repeated key is an error:
/// silently keeping either occurrence would change the run behind the
/// author's back.
pub fn parse_set_str(text: &str) -> Result<TrialSpec, ParseError> {
    let mut parameters: Vec<(String, ParamValue)> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let parts: Vec<&str> = line.split('=').collect();
        if parts.len() != 2 {
            continue;
        }
        let name = parts[0];
        if parameters.iter().any(|(n, _)| n == name) {
            return Err(ParseError::DuplicateParameter(name.to_string()));
        }
        parameters.push((name.to_string(), ParamValue::literal(parts[1])));
    }
    Ok(TrialSpec::bootstrap(parameters))
}

/// Structured trial document, as produced by `convert` and by the audit
/// copies written next to optimization reports.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrialDoc {
    expert_advisor: String,
    symbol: String,
    period: u32,
    #[serde(deserialize_with = "flexible_date")]
    from_date: NaiveDate,
    #[serde(deserialize_with = "flexible_date")]
    to_date: NaiveDate,
    #[serde(default)]
    optimization: bool,
    #[serde(default)]
    parameters: serde_json::Map<String, serde_json::Value>,
}

/// Parse a structured JSON trial document.
pub fn parse_trial_json(text: &str) -> Result<TrialSpec, ParseError> {
    let doc: TrialDoc = serde_json::from_str(text)?;

    let mut parameters = Vec::with_capacity(doc.parameters.len());
    for (name, value) in doc.parameters {
        let value: ParamValue = serde_json::from_value(value)?;
        parameters.push((name, value));
    }

    let trial = TrialSpec {
        advisor: doc.expert_advisor,
        symbol: doc.symbol,
        timeframe: doc.period,
        from_date: doc.from_date,
        to_date: doc.to_date,
        optimization: doc.optimization,
        parameters,
    };

    if trial.from_date > trial.to_date {
        return Err(ParseError::InvalidDateRange {
            from: trial.from_date,
            to: trial.to_date,
        });
    }
    Ok(trial)
}

/// Serialize a trial as a structured JSON document.
///
/// Used for `convert` output and for the audit copy written per
/// optimization trial. Sweep ranges are echoed as `{Start, Step, Stop}`
/// objects; parameter order is preserved.
pub fn trial_to_json(trial: &TrialSpec) -> Result<String, serde_json::Error> {
    use serde_json::{json, Map, Value};

    let mut params = Map::new();
    for (name, value) in &trial.parameters {
        let v = match value {
            ParamValue::Literal(v) => v.clone(),
            ParamValue::Sweep(r) => json!({ "Start": r.start, "Step": r.step, "Stop": r.stop }),
        };
        params.insert(name.clone(), v);
    }

    let mut doc = Map::new();
    doc.insert("ExpertAdvisor".into(), Value::String(trial.advisor.clone()));
    doc.insert("Symbol".into(), Value::String(trial.symbol.clone()));
    doc.insert("Period".into(), json!(trial.timeframe));
    doc.insert(
        "FromDate".into(),
        Value::String(trial.from_date.format("%Y-%m-%d").to_string()),
    );
    doc.insert(
        "ToDate".into(),
        Value::String(trial.to_date.format("%Y-%m-%d").to_string()),
    );
    doc.insert("Optimization".into(), Value::Bool(trial.optimization));
    doc.insert("Parameters".into(), Value::Object(params));

    serde_json::to_string_pretty(&Value::Object(doc))
}

/// Accepts `2023-01-01` and the datetime form `2023-01-01T00:00:00` that
/// older tooling emitted.
fn flexible_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    let raw = String::deserialize(deserializer)?;
    let date_part = raw.split('T').next().unwrap_or(&raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| D::Error::custom(format!("invalid date '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_file_bootstraps_defaults_and_merges_parameters() {
        let trial = parse_set_str("RiskPercent=2\nLots=0.1\n").unwrap();
        assert_eq!(trial.advisor, "AcePhoenixStd3.71");
        assert_eq!(trial.symbol, "EURUSD");
        assert_eq!(trial.timeframe, 15);
        assert_eq!(trial.parameter_names(), vec!["RiskPercent", "Lots"]);
        assert_eq!(
            trial.parameters[0].1.literal_text().as_deref(),
            Some("2")
        );
    }

    #[test]
    fn set_file_skips_lines_without_exactly_one_separator() {
        let trial = parse_set_str("; comment\nA=1\nB=1=2\nblank\n").unwrap();
        assert_eq!(trial.parameter_names(), vec!["A"]);
    }

    #[test]
    fn set_file_tolerates_crlf_endings() {
        let trial = parse_set_str("A=1\r\nB=2\r\n").unwrap();
        assert_eq!(trial.parameter_names(), vec!["A", "B"]);
        assert_eq!(trial.parameters[1].1.literal_text().as_deref(), Some("2"));
    }

    #[test]
    fn set_file_rejects_duplicate_keys() {
        let err = parse_set_str("A=1\nA=2\n").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateParameter(ref k) if k == "A"));
    }

    #[test]
    fn json_document_round_trips_through_convert() {
        let original = parse_set_str("RiskPercent=2\n").unwrap();
        let json = trial_to_json(&original).unwrap();
        let reloaded = parse_trial_json(&json).unwrap();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn json_document_parses_sweeps_in_declared_order() {
        let json = r#"{
            "ExpertAdvisor": "Gridder1.2",
            "Symbol": "GBPUSD",
            "Period": 60,
            "FromDate": "2022-06-01",
            "ToDate": "2022-12-31",
            "Optimization": true,
            "Parameters": {
                "TakeProfit": { "Start": 10, "Step": 10, "Stop": 50 },
                "Lots": "0.1"
            }
        }"#;
        let trial = parse_trial_json(json).unwrap();
        assert_eq!(trial.advisor, "Gridder1.2");
        assert_eq!(trial.timeframe, 60);
        assert!(trial.optimization);
        assert_eq!(trial.parameter_names(), vec!["TakeProfit", "Lots"]);
        assert!(trial.parameters[0].1.is_sweep());
        assert!(!trial.parameters[1].1.is_sweep());
    }

    #[test]
    fn json_document_accepts_datetime_dates() {
        let json = r#"{
            "ExpertAdvisor": "X",
            "Symbol": "EURUSD",
            "Period": 15,
            "FromDate": "2023-01-01T00:00:00",
            "ToDate": "2023-12-31T00:00:00",
            "Parameters": {}
        }"#;
        let trial = parse_trial_json(json).unwrap();
        assert_eq!(trial.date_range_label(), "2023.01.01 - 2023.12.31");
    }

    #[test]
    fn json_document_rejects_inverted_window() {
        let json = r#"{
            "ExpertAdvisor": "X",
            "Symbol": "EURUSD",
            "Period": 15,
            "FromDate": "2023-12-31",
            "ToDate": "2023-01-01",
            "Parameters": {}
        }"#;
        let err = parse_trial_json(json).unwrap_err();
        assert!(matches!(err, ParseError::InvalidDateRange { .. }));
    }

    #[test]
    fn load_trial_rejects_unknown_extension() {
        let dir = std::env::temp_dir().join(format!("mt4lab_input_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("trial.txt");
        std::fs::write(&path, "A=1").unwrap();
        let err = load_trial(&path).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedExtension(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_trial_missing_file_is_io_error() {
        let err = load_trial(Path::new("/nonexistent/trial.set")).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
