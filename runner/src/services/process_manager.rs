//! Real process management service implementation
//!
//! Spawns background helpers (the port-forward) and stops them with a
//! SIGTERM, escalating to SIGKILL when the grace period runs out.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::error::{RunnerError, RunnerResult};
use crate::traits::{BackgroundHandle, Invocation, ProcessManager};
use shared::{ProcessId, process_debug, process_info, process_warn};

/// Real process manager implementation
pub struct RealProcessManager {
    /// Active helpers keyed by OS pid
    active: Mutex<HashMap<u32, ManagedProcess>>,

    /// How long a helper gets to exit after SIGTERM
    grace_period: Duration,
}

/// Handle for a managed process
struct ManagedProcess {
    child: Child,
    label: String,
    start_time: std::time::Instant,
}

impl RealProcessManager {
    /// Create new process manager with default settings
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            grace_period: Duration::from_secs(2),
        }
    }

    /// Configure the SIGTERM grace period (fluent API)
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Number of helpers currently tracked
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    async fn stop_process(&self, pid: u32, mut process: ManagedProcess) -> RunnerResult<()> {
        let helper = ProcessId::Helper(pid);

        if let Some(status) = process.child.try_wait()? {
            process_debug!(helper, "💤 {} already exited with {}", process.label, status);
            return Ok(());
        }

        send_terminate(&mut process.child, pid);

        match tokio::time::timeout(self.grace_period, process.child.wait()).await {
            Ok(status) => {
                let status = status?;
                process_info!(
                    helper,
                    "🔌 Stopped {} after {:.1}s ({})",
                    process.label,
                    process.start_time.elapsed().as_secs_f64(),
                    status
                );
                Ok(())
            }
            Err(_) => {
                process_warn!(helper, "🔨 {} ignored SIGTERM, killing", process.label);
                process.child.kill().await?;
                Ok(())
            }
        }
    }
}

impl Default for RealProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child, pid: u32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Ok(raw_pid) = i32::try_from(pid) else {
        let _ = child.start_kill();
        return;
    };

    match signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
        Ok(()) => {
            process_debug!(ProcessId::Helper(pid), "📤 Sent SIGTERM");
        }
        // Exited between try_wait and the signal; wait() reaps it
        Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => {
            process_warn!(ProcessId::Helper(pid), "SIGTERM failed ({}), killing", e);
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, _pid: u32) {
    let _ = child.start_kill();
}

#[async_trait]
impl ProcessManager for RealProcessManager {
    async fn spawn_background(&self, invocation: &Invocation) -> RunnerResult<BackgroundHandle> {
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::SpawnFailed {
                program: invocation.program.clone(),
                source,
            })?;

        let pid = child.id().ok_or_else(|| RunnerError::SpawnFailed {
            program: invocation.program.clone(),
            source: std::io::Error::other("process exited before a pid was assigned"),
        })?;

        let label = invocation.to_string();
        process_info!(ProcessId::Helper(pid), "🚇 Started background helper: {}", label);

        self.active.lock().await.insert(
            pid,
            ManagedProcess {
                child,
                label: label.clone(),
                start_time: std::time::Instant::now(),
            },
        );

        Ok(BackgroundHandle::new(pid, label))
    }

    async fn terminate(&self, handle: BackgroundHandle) -> RunnerResult<()> {
        let pid = handle.pid();
        let process = self.active.lock().await.remove(&pid);

        match process {
            Some(process) => self.stop_process(pid, process).await,
            None => Err(RunnerError::UnknownHelper { pid }),
        }
    }

    async fn stop_all(&self) -> RunnerResult<()> {
        let drained: Vec<(u32, ManagedProcess)> = self.active.lock().await.drain().collect();

        let mut first_error = None;
        for (pid, process) in drained {
            if let Err(e) = self.stop_process(pid, process).await {
                process_warn!(ProcessId::Helper(pid), "Failed to stop helper: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
