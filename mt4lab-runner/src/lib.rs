//! Batch orchestration for the external strategy tester.
//!
//! Builds on `mt4lab-core` to provide:
//! - Engine process supervision with bounded waits and guaranteed cleanup of
//!   the transient configuration artifact
//! - Summary CSV accumulation and per-trial audit copies
//! - The sequential batch driver with per-trial fault isolation

pub mod batch;
pub mod summary;
pub mod supervisor;

pub use batch::{
    run_batch, BatchConfig, BatchError, BatchObserver, BatchOutcome, QuietObserver,
    StdoutObserver, TrialError, TrialOutcome,
};
pub use summary::{write_audit_copy, SummaryError, SummaryWriter, METRIC_COLUMNS};
pub use supervisor::{
    run_engine, EngineConfig, EngineObserver, EngineRun, SilentObserver, SuperviseError,
};
