//! Runner-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("{tool} is not installed. Please install {tool} first.")]
    ToolMissing { tool: String },

    #[error("{step} failed: `{command}` exited with {}", describe_code(.code))]
    CommandFailed {
        step: String,
        command: String,
        code: Option<i32>,
    },

    #[error("Failed to launch `{program}`: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No background helper with pid {pid} is being tracked")]
    UnknownHelper { pid: u32 },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Interrupted: {reason}")]
    Interrupted { reason: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RunnerError {
    pub fn config(field: impl Into<String>) -> Self {
        RunnerError::ConfigurationError { field: field.into() }
    }

    /// Process exit code reported to the shell
    pub fn exit_code(&self) -> u8 {
        match self {
            RunnerError::Interrupted { .. } => 130,
            _ => 1,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;
