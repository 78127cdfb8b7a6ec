//! Real command execution service
//!
//! Streams or captures the output of external tools and reports how they
//! terminated. A non-zero exit is an outcome, not an error; only failing to
//! launch the program is.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{RunnerError, RunnerResult};
use crate::traits::{CommandOutcome, CommandRunner, Invocation};
use shared::{ProcessId, process_debug};

pub struct RealCommandRunner;

impl RealCommandRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        // An interrupted run drops the future; the tool must not outlive it
        cmd.args(&invocation.args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn spawn_error(invocation: &Invocation, source: std::io::Error) -> RunnerError {
        RunnerError::SpawnFailed {
            program: invocation.program.clone(),
            source,
        }
    }
}

impl Default for RealCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for RealCommandRunner {
    async fn run(&self, invocation: &Invocation) -> RunnerResult<CommandOutcome> {
        process_debug!(ProcessId::current(), "▶️  {}", invocation);

        let status = Self::command(invocation)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Self::spawn_error(invocation, e))?;

        process_debug!(ProcessId::current(), "⏹️  {} -> {:?}", invocation.program, status.code());
        Ok(CommandOutcome {
            code: status.code(),
            stdout: String::new(),
        })
    }

    async fn capture(&self, invocation: &Invocation) -> RunnerResult<CommandOutcome> {
        process_debug!(ProcessId::current(), "▶️  {} (captured)", invocation);

        let output = Self::command(invocation)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Self::spawn_error(invocation, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            process_debug!(ProcessId::current(), "stderr from {}: {}", invocation.program, stderr.trim());
        }

        Ok(CommandOutcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        })
    }
}
