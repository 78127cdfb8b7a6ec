//! Trait definitions with mockall annotations for testing
//!
//! The runbook only talks to the outside world through these seams: locating
//! tools on the machine, running a command to completion, and owning the one
//! background helper process. Real implementations live in `services`.

use std::fmt;

use crate::error::RunnerResult;

/// One external command: program plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How an external command terminated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    /// Captured standard output (empty when output was streamed)
    pub stdout: String,
}

impl CommandOutcome {
    pub fn success() -> Self {
        Self::exited(0)
    }

    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Handle to a running background helper
///
/// Deliberately not `Clone`: `ProcessManager::terminate` consumes it, so a
/// helper can only be signalled once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a background helper must be terminated"]
pub struct BackgroundHandle {
    pid: u32,
    label: String,
}

impl BackgroundHandle {
    pub fn new(pid: u32, label: impl Into<String>) -> Self {
        Self {
            pid,
            label: label.into(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Locates required tools on the executing machine
#[mockall::automock]
pub trait ToolLocator: Send + Sync {
    /// Whether `tool` resolves to an executable
    fn is_installed(&self, tool: &str) -> bool;
}

/// Runs external commands to completion
#[mockall::automock]
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run with output streamed to the operator's terminal
    async fn run(&self, invocation: &Invocation) -> RunnerResult<CommandOutcome>;

    /// Run with standard output captured into the outcome
    async fn capture(&self, invocation: &Invocation) -> RunnerResult<CommandOutcome>;
}

/// Owns background helper processes for the duration of a step
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessManager: Send + Sync {
    /// Launch `invocation` without waiting for it
    async fn spawn_background(&self, invocation: &Invocation) -> RunnerResult<BackgroundHandle>;

    /// Stop the helper behind `handle` and reap it
    async fn terminate(&self, handle: BackgroundHandle) -> RunnerResult<()>;

    /// Stop every helper still tracked (used on interrupt)
    async fn stop_all(&self) -> RunnerResult<()>;
}
