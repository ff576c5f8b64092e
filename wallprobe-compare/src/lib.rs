//! Sequential direct-vs-probe comparison runs and their reports.

pub mod orchestrator;
pub mod report;

pub use orchestrator::{Orchestrator, Pacing};
pub use report::{ComparisonEntry, ComparisonReport, Method, MethodTally, RunMode, Verdict};
