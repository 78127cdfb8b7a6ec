//! Builder for runbooks wired to scripted mocks
//!
//! Every call the runbook makes is appended to a shared `Recorder` so tests
//! can assert on ordering, e.g. "run: kubectl scale ..." before
//! "spawn: kubectl port-forward ...".

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use runner::{
    BackgroundHandle, CommandOutcome, MockCommandRunner, MockProcessManager, MockToolLocator, Runbook, RunnerConfig,
    RunnerError,
};

use super::fixtures::TestFixtures;

pub type MockRunbook = Runbook<MockToolLocator, MockCommandRunner, MockProcessManager>;

/// Ordered log of every external interaction
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Index of the first event containing `needle`
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.events().iter().position(|e| e.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.events().iter().filter(|e| e.contains(needle)).count()
    }

    /// Assert the needles occur (first occurrence) in the given order
    pub fn assert_order(&self, needles: &[&str]) {
        let positions: Vec<usize> = needles
            .iter()
            .map(|needle| {
                self.position(needle)
                    .unwrap_or_else(|| panic!("'{needle}' never happened; events: {:#?}", self.events()))
            })
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "expected order {needles:?}, got events {:#?}",
            self.events()
        );
    }
}

/// Builder pattern for creating test runbooks with sensible defaults
pub struct ClusterBuilder {
    config: RunnerConfig,
    installed: HashSet<String>,
    failures: Vec<(String, i32)>,
    captured: Vec<(String, String)>,
    spawn_fails: bool,
    terminate_fails: bool,
    terminate_times: usize,
}

impl ClusterBuilder {
    /// All tools installed, every command succeeds
    pub fn new() -> Self {
        Self {
            config: TestFixtures::config(),
            installed: ["kubectl", "minikube", "wrk"].into_iter().map(String::from).collect(),
            failures: Vec::new(),
            captured: vec![("jsonpath".to_string(), "8000".to_string())],
            spawn_fails: false,
            terminate_fails: false,
            terminate_times: 1,
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn without_tool(mut self, tool: &str) -> Self {
        self.installed.remove(tool);
        self
    }

    /// Commands whose command line contains `needle` exit with `code`
    pub fn failing(mut self, needle: &str, code: i32) -> Self {
        self.failures.push((needle.to_string(), code));
        self
    }

    /// Captured commands containing `needle` print `stdout`
    pub fn with_stdout(mut self, needle: &str, stdout: &str) -> Self {
        self.captured.insert(0, (needle.to_string(), stdout.to_string()));
        self
    }

    pub fn failing_port_forward(mut self) -> Self {
        self.spawn_fails = true;
        self.terminate_times = 0;
        self
    }

    /// The helper is signalled but reports a cleanup error
    pub fn failing_terminate(mut self) -> Self {
        self.terminate_fails = true;
        self
    }

    /// Expected number of helper terminations (verified when the mock drops)
    pub fn expect_terminations(mut self, times: usize) -> Self {
        self.terminate_times = times;
        self
    }

    pub fn build(self) -> (MockRunbook, Recorder) {
        let recorder = Recorder::default();

        let mut locator = MockToolLocator::new();
        let installed = self.installed;
        locator
            .expect_is_installed()
            .returning(move |tool| installed.contains(tool))
            .times(0..);

        let mut commands = MockCommandRunner::new();
        let rec = recorder.clone();
        let failures = self.failures.clone();
        commands
            .expect_run()
            .returning(move |invocation| {
                let line = invocation.to_string();
                rec.push(format!("run: {line}"));
                Ok(CommandOutcome::exited(exit_code_for(&failures, &line)))
            })
            .times(0..);

        let rec = recorder.clone();
        let failures = self.failures;
        let captured = self.captured;
        commands
            .expect_capture()
            .returning(move |invocation| {
                let line = invocation.to_string();
                rec.push(format!("capture: {line}"));
                let stdout = captured
                    .iter()
                    .find(|(needle, _)| line.contains(needle.as_str()))
                    .map(|(_, out)| out.clone())
                    .unwrap_or_default();
                Ok(CommandOutcome::exited(exit_code_for(&failures, &line)).with_stdout(stdout))
            })
            .times(0..);

        let mut processes = MockProcessManager::new();
        let rec = recorder.clone();
        let spawn_fails = self.spawn_fails;
        processes
            .expect_spawn_background()
            .returning(move |invocation| {
                rec.push(format!("spawn: {invocation}"));
                if spawn_fails {
                    return Err(RunnerError::SpawnFailed {
                        program: invocation.program.clone(),
                        source: std::io::Error::from(std::io::ErrorKind::NotFound),
                    });
                }
                Ok(BackgroundHandle::new(TestFixtures::HELPER_PID, invocation.to_string()))
            })
            .times(0..);

        let rec = recorder.clone();
        let terminate_fails = self.terminate_fails;
        processes
            .expect_terminate()
            .returning(move |handle| {
                rec.push(format!("terminate: {}", handle.pid()));
                if terminate_fails {
                    return Err(RunnerError::UnknownHelper { pid: handle.pid() });
                }
                Ok(())
            })
            .times(self.terminate_times);

        processes.expect_stop_all().returning(|| Ok(())).times(0..);

        (Runbook::new(self.config, locator, commands, processes), recorder)
    }
}

fn exit_code_for(failures: &[(String, i32)], line: &str) -> i32 {
    failures
        .iter()
        .find(|(needle, _)| line.contains(needle.as_str()))
        .map(|(_, code)| *code)
        .unwrap_or(0)
}
