//! Cluster operations runner
//!
//! Drives a local Kubernetes cluster through its command-line tools: brings
//! the cluster up, applies the application's manifest, scales the deployment,
//! load tests it through a temporary port-forward and reads resource usage.
//! Every external interaction goes through the traits in [`traits`], so the
//! sequencing in [`runbook`] is testable without a cluster.

pub mod config;
pub mod core;
pub mod error;
pub mod runbook;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{LoadTestConfig, RunnerConfig, ToolNames};
pub use crate::core::{RunReport, Step, StepStatus};
pub use error::{RunnerError, RunnerResult};
pub use runbook::Runbook;
pub use traits::{
    BackgroundHandle, CommandOutcome, CommandRunner, Invocation, MockCommandRunner, MockProcessManager,
    MockToolLocator, ProcessManager, ToolLocator,
};

/// Shell exit code for the result of a run
pub fn exit_code<T>(result: &RunnerResult<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => e.exit_code(),
    }
}
