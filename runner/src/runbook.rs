//! Cluster operations runbook
//!
//! Sequences the external tool invocations that bring up the local cluster,
//! scale the deployment and measure it. Steps run strictly one after another.
//! Fatal steps stop the sequence with an error; informational steps only
//! record a warning. The port-forward helper launched for the load test is
//! always terminated exactly once, whatever the load test returned.

use std::io::Write;

use shared::{ProcessId, logging, process_debug, process_error, process_info, process_warn};

use crate::config::RunnerConfig;
use crate::core::{CommandSet, KubectlMode, RunReport, Step, StepStatus};
use crate::error::{RunnerError, RunnerResult};
use crate::traits::{CommandRunner, Invocation, ProcessManager, ToolLocator};

/// Runbook that drives the cluster through injected services
pub struct Runbook<L, C, P>
where
    L: ToolLocator,
    C: CommandRunner,
    P: ProcessManager,
{
    config: RunnerConfig,

    /// Injected services
    locator: L,
    commands: C,
    processes: P,
}

impl<L, C, P> Runbook<L, C, P>
where
    L: ToolLocator,
    C: CommandRunner,
    P: ProcessManager,
{
    /// Create new runbook with injected dependencies
    pub fn new(config: RunnerConfig, locator: L, commands: C, processes: P) -> Self {
        Self {
            config,
            locator,
            commands,
            processes,
        }
    }

    fn kubectl_mode(&self) -> KubectlMode {
        if self.locator.is_installed(&self.config.tools.kubectl) {
            KubectlMode::Native
        } else {
            KubectlMode::ViaMinikube
        }
    }

    fn command_set(&self) -> CommandSet<'_> {
        CommandSet::new(&self.config.tools, self.kubectl_mode())
    }

    // ---- sequences -------------------------------------------------------

    /// Start the local cluster, verify it answers, list what runs on it
    pub async fn run_setup(&self, report: &mut RunReport) -> RunnerResult<()> {
        logging::log_startup(ProcessId::current(), "cluster setup");

        self.preflight(&self.config.tools.minikube, report)?;
        self.start_cluster(report).await?;
        self.check_connectivity(report).await?;
        self.list_pods(report).await;

        logging::log_success(ProcessId::current(), "Cluster is up and reachable");
        Ok(())
    }

    /// Submit the deployment and service descriptors to the cluster
    pub async fn run_apply(&self, report: &mut RunReport) -> RunnerResult<()> {
        logging::log_startup(ProcessId::current(), "manifest apply");

        self.preflight(&self.config.tools.kubectl, report)?;
        self.apply_manifest(report).await?;

        logging::log_success(ProcessId::current(), "Manifest applied");
        Ok(())
    }

    /// Scale, wait for the rollout, load test through a port-forward, read metrics
    pub async fn run_scale(&self, report: &mut RunReport) -> RunnerResult<()> {
        logging::log_startup(ProcessId::current(), "scale and load test");

        self.preflight(&self.config.tools.kubectl, report)?;
        self.scale_deployment(report).await?;
        self.wait_for_rollout(report).await?;
        self.list_deployment_pods(report).await;
        self.load_test(report).await;
        self.check_resource_usage(report).await;

        logging::log_success(ProcessId::current(), "Scale run complete");
        Ok(())
    }

    /// Setup, apply and scale back to back
    pub async fn run_all(&self, report: &mut RunReport) -> RunnerResult<()> {
        self.run_setup(report).await?;
        self.run_apply(report).await?;
        self.run_scale(report).await
    }

    /// Stop any helper still running (interrupt path)
    pub async fn shutdown(&self) -> RunnerResult<()> {
        self.processes.stop_all().await
    }

    // ---- steps -----------------------------------------------------------

    /// Fail fast when a required tool is absent
    pub fn preflight(&self, tool: &str, report: &mut RunReport) -> RunnerResult<()> {
        if self.locator.is_installed(tool) {
            process_debug!(ProcessId::current(), "🔎 Found {}", tool);
            report.record(Step::Preflight, StepStatus::Succeeded);
            return Ok(());
        }

        let err = RunnerError::ToolMissing { tool: tool.to_string() };
        process_error!(ProcessId::current(), "❌ {}", err);
        report.record(Step::Preflight, StepStatus::Failed(err.to_string()));
        Err(err)
    }

    pub async fn start_cluster(&self, report: &mut RunReport) -> RunnerResult<()> {
        logging::log_progress(ProcessId::current(), "Cluster start", "starting the local cluster");
        let invocation = self.command_set().minikube_start();
        self.run_fatal(Step::ClusterStart, &invocation, report).await
    }

    /// `kubectl cluster-info`, or minikube's bundled client when kubectl is absent
    pub async fn check_connectivity(&self, report: &mut RunReport) -> RunnerResult<()> {
        let commands = self.command_set();
        if commands.kubectl_mode() == KubectlMode::ViaMinikube {
            process_warn!(
                ProcessId::current(),
                "⚠️  {} not found, falling back to `{} kubectl --`",
                self.config.tools.kubectl,
                self.config.tools.minikube
            );
        }
        logging::log_progress(ProcessId::current(), "Connectivity check", "querying cluster-info");
        self.run_fatal(Step::Connectivity, &commands.cluster_info(), report).await
    }

    pub async fn list_pods(&self, report: &mut RunReport) {
        logging::log_progress(ProcessId::current(), "Pod enumeration", "all namespaces");
        let invocation = self.command_set().list_all_pods();
        self.run_informational(Step::Enumeration, &invocation, report, "could not list pods")
            .await;
    }

    pub async fn apply_manifest(&self, report: &mut RunReport) -> RunnerResult<()> {
        let rendered = match self.config.manifest().render() {
            Ok(rendered) => rendered,
            Err(e) => {
                report.record(Step::Apply, StepStatus::Failed(e.to_string()));
                return Err(e.into());
            }
        };

        // Removed when `staged` drops, after kubectl has read it
        let mut staged = tempfile::Builder::new()
            .prefix("runner-manifest-")
            .suffix(".json")
            .tempfile()?;
        staged.write_all(rendered.as_bytes())?;
        staged.flush()?;

        let path = staged.path().to_string_lossy().into_owned();
        logging::log_progress(ProcessId::current(), "Manifest apply", &path);
        let invocation = self.command_set().apply(&path);
        self.run_fatal(Step::Apply, &invocation, report).await
    }

    pub async fn scale_deployment(&self, report: &mut RunReport) -> RunnerResult<()> {
        logging::log_progress(
            ProcessId::current(),
            "Scale",
            &format!("{} -> {} replicas", self.config.deployment, self.config.replicas),
        );
        let invocation = self
            .command_set()
            .scale(&self.config.deployment, self.config.replicas);
        self.run_fatal(Step::Scale, &invocation, report).await
    }

    /// Blocks until kubectl reports the rollout complete
    pub async fn wait_for_rollout(&self, report: &mut RunReport) -> RunnerResult<()> {
        logging::log_progress(ProcessId::current(), "Rollout wait", &self.config.deployment);
        let invocation = self.command_set().rollout_status(&self.config.deployment);
        self.run_fatal(Step::Rollout, &invocation, report).await
    }

    pub async fn list_deployment_pods(&self, report: &mut RunReport) {
        let invocation = self.command_set().list_pods_for(&self.config.deployment);
        self.run_informational(Step::DeploymentPods, &invocation, report, "could not list deployment pods")
            .await;
    }

    /// Port-forward the service, run the load test against it, stop the forward
    pub async fn load_test(&self, report: &mut RunReport) {
        let load = &self.config.load_test;

        if !self.locator.is_installed(&self.config.tools.wrk) {
            let reason = format!("{} is not installed", self.config.tools.wrk);
            logging::log_warning(ProcessId::current(), "Load test", &format!("{reason}, skipping"));
            report.record(Step::LoadTest, StepStatus::Skipped(reason));
            return;
        }

        if let Some(address) = self.cluster_address().await {
            process_info!(ProcessId::current(), "🌐 Cluster address: {}", address);
        }

        let commands = self.command_set();
        let service_port = self.resolve_service_port().await;
        let forward = commands.port_forward(&self.config.service, load.local_port, service_port);

        let helper = match self.processes.spawn_background(&forward).await {
            Ok(helper) => helper,
            Err(e) => {
                logging::log_warning(ProcessId::current(), "Port-forward", &e.to_string());
                report.record(Step::PortForward, StepStatus::Failed(e.to_string()));
                report.record(Step::LoadTest, StepStatus::Skipped("no port-forward".to_string()));
                return;
            }
        };
        process_info!(
            ProcessId::current(),
            "🚇 Forwarding 127.0.0.1:{} -> service/{}:{} (pid {})",
            load.local_port,
            self.config.service,
            service_port,
            helper.pid()
        );

        tokio::time::sleep(load.warmup).await;

        logging::log_progress(
            ProcessId::current(),
            "Load test",
            &format!(
                "{} threads, {} connections, {}s against {}",
                load.threads,
                load.connections,
                load.duration.as_secs(),
                load.target_url()
            ),
        );
        let outcome = self.commands.run(&commands.load_test(load)).await;

        // Released regardless of the load test's result
        match self.processes.terminate(helper).await {
            Ok(()) => report.record(Step::PortForward, StepStatus::Succeeded),
            Err(e) => {
                logging::log_warning(ProcessId::current(), "Port-forward", &format!("cleanup failed: {e}"));
                report.record(Step::PortForward, StepStatus::Warned(e.to_string()));
            }
        }

        match outcome {
            Ok(outcome) if outcome.is_success() => report.record(Step::LoadTest, StepStatus::Succeeded),
            Ok(outcome) => {
                let reason = format!("load test exited with {:?}", outcome.code);
                logging::log_warning(ProcessId::current(), "Load test", &reason);
                report.record(Step::LoadTest, StepStatus::Warned(reason));
            }
            Err(e) => {
                logging::log_warning(ProcessId::current(), "Load test", &e.to_string());
                report.record(Step::LoadTest, StepStatus::Warned(e.to_string()));
            }
        }
    }

    /// `kubectl top pods`; a missing metrics-server is only a warning
    pub async fn check_resource_usage(&self, report: &mut RunReport) {
        logging::log_progress(ProcessId::current(), "Resource usage", "kubectl top pods");
        let invocation = self.command_set().top_pods();
        self.run_informational(
            Step::ResourceUsage,
            &invocation,
            report,
            "metrics unavailable, is metrics-server enabled? (minikube addons enable metrics-server)",
        )
        .await;
    }

    // ---- helpers ---------------------------------------------------------

    async fn run_fatal(&self, step: Step, invocation: &Invocation, report: &mut RunReport) -> RunnerResult<()> {
        debug_assert!(step.is_fatal());
        let outcome = match self.commands.run(invocation).await {
            Ok(outcome) => outcome,
            Err(e) => {
                report.record(step, StepStatus::Failed(e.to_string()));
                return Err(e);
            }
        };

        if outcome.is_success() {
            report.record(step, StepStatus::Succeeded);
            return Ok(());
        }

        let err = RunnerError::CommandFailed {
            step: step.to_string(),
            command: invocation.to_string(),
            code: outcome.code,
        };
        report.record(step, StepStatus::Failed(err.to_string()));
        Err(err)
    }

    async fn run_informational(&self, step: Step, invocation: &Invocation, report: &mut RunReport, warning: &str) {
        debug_assert!(!step.is_fatal());
        let failure = match self.commands.run(invocation).await {
            Ok(outcome) if outcome.is_success() => None,
            Ok(outcome) => Some(format!("{warning} (exit {:?})", outcome.code)),
            Err(e) => Some(format!("{warning} ({e})")),
        };

        match failure {
            None => report.record(step, StepStatus::Succeeded),
            Some(reason) => {
                logging::log_warning(ProcessId::current(), &step.to_string(), &reason);
                report.record(step, StepStatus::Warned(reason));
            }
        }
    }

    /// `minikube ip`, when minikube is around to answer
    async fn cluster_address(&self) -> Option<String> {
        if !self.locator.is_installed(&self.config.tools.minikube) {
            return None;
        }
        match self.commands.capture(&self.command_set().minikube_ip()).await {
            Ok(outcome) if outcome.is_success() && !outcome.stdout.is_empty() => Some(outcome.stdout),
            _ => None,
        }
    }

    /// Port the service exposes, falling back to the configured one
    async fn resolve_service_port(&self) -> u16 {
        let invocation = self.command_set().service_port(&self.config.service);
        match self.commands.capture(&invocation).await {
            Ok(outcome) if outcome.is_success() => match outcome.stdout.parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => {
                    process_debug!(
                        ProcessId::current(),
                        "Unexpected service port '{}', using {}",
                        outcome.stdout,
                        self.config.port
                    );
                    self.config.port
                }
            },
            _ => self.config.port,
        }
    }
}
