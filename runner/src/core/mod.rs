//! Core runbook building blocks

pub mod commands;
pub mod report;

pub use commands::{CommandSet, KubectlMode};
pub use report::{RunReport, Step, StepRecord, StepStatus};
