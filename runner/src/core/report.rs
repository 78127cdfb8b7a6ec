//! Per-step record of a run

use std::fmt;

use shared::{ProcessId, logging, process_info};

/// A step of the runbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Preflight,
    ClusterStart,
    Connectivity,
    Enumeration,
    Apply,
    Scale,
    Rollout,
    DeploymentPods,
    LoadTest,
    PortForward,
    ResourceUsage,
}

impl Step {
    /// Fatal steps abort the whole sequence on failure
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Step::Preflight | Step::ClusterStart | Step::Connectivity | Step::Apply | Step::Scale | Step::Rollout
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Preflight => "Preflight check",
            Step::ClusterStart => "Cluster start",
            Step::Connectivity => "Connectivity check",
            Step::Enumeration => "Pod enumeration",
            Step::Apply => "Manifest apply",
            Step::Scale => "Scale",
            Step::Rollout => "Rollout wait",
            Step::DeploymentPods => "Deployment pods",
            Step::LoadTest => "Load test",
            Step::PortForward => "Port-forward",
            Step::ResourceUsage => "Resource usage",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    /// Best-effort step degraded; the run continues
    Warned(String),
    /// Step not attempted
    Skipped(String),
    /// Fatal step failed; the run stops here
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
}

/// Ordered outcome of every step attempted so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    records: Vec<StepRecord>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: Step, status: StepStatus) {
        self.records.push(StepRecord { step, status });
    }

    /// Steps in the order they were attempted
    pub fn steps(&self) -> Vec<Step> {
        self.records.iter().map(|r| r.step).collect()
    }

    pub fn status_of(&self, step: Step) -> Option<&StepStatus> {
        self.records.iter().rev().find(|r| r.step == step).map(|r| &r.status)
    }

    pub fn warnings(&self) -> Vec<&StepRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.status, StepStatus::Warned(_)))
            .collect()
    }

    pub fn has_failure(&self) -> bool {
        self.records.iter().any(|r| matches!(r.status, StepStatus::Failed(_)))
    }

    pub fn log_summary(&self) {
        let id = ProcessId::current();
        process_info!(id, "📊 Run summary ({} steps)", self.records.len());
        for record in &self.records {
            match &record.status {
                StepStatus::Succeeded => logging::log_success(id, &record.step.to_string()),
                StepStatus::Warned(reason) => logging::log_warning(id, &record.step.to_string(), reason),
                StepStatus::Skipped(reason) => {
                    logging::log_progress(id, &record.step.to_string(), &format!("skipped ({reason})"))
                }
                StepStatus::Failed(reason) => logging::log_error(id, &record.step.to_string(), reason),
            }
        }
    }
}
