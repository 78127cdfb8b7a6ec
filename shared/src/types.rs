//! Core types used throughout the runner

use std::fmt;
use std::sync::OnceLock;

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Identity attached to every log line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProcessId {
    /// The runner itself (singleton)
    Runner,
    /// Background helper spawned by the runner, keyed by OS pid
    Helper(u32),
}

impl ProcessId {
    /// Initialize the global process ID for the runner
    pub fn init_runner() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Runner)
    }

    /// Get the global process ID, falling back to the runner identity
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Runner)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Runner => write!(f, "runner"),
            ProcessId::Helper(pid) => write!(f, "helper_{pid}"),
        }
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        ProcessId::Runner
    }
}

/// Environment variable passed to a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::str::FromStr for KeyValuePair {
    type Err = String;

    /// Parses `KEY=VALUE`; the value may itself contain `=`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(KeyValuePair::new(key.trim(), value)),
            _ => Err(format!("Expected KEY=VALUE, got '{s}'")),
        }
    }
}

impl fmt::Display for KeyValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
