//! Core domain for batch-driving the MetaTrader 4 strategy tester.
//!
//! This crate holds the pure (no-process, no-directory-walking) half of the
//! pipeline:
//! - Trial specifications with literal parameters and optimization sweeps
//! - Loading of legacy `.set` files and structured JSON trial documents
//! - Translation of a trial into the tester's `[Tester]` INI configuration
//! - Metric extraction from the tester's HTML reports

pub mod input;
pub mod report;
pub mod tester_ini;
pub mod trial;

pub use input::{load_trial, parse_set_str, parse_trial_json, trial_to_json, ParseError};
pub use report::{Report, NOT_AVAILABLE};
pub use tester_ini::{translate, TranslateError};
pub use trial::{ParamValue, SweepRange, TrialSpec};
