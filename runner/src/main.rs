//! Main entry point for the runner binary
//!
//! Wires the real services into the runbook and maps the outcome to the
//! process exit code: 0 on success, 1 on the first fatal failure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;

use runner::services::{PathToolLocator, RealCommandRunner, RealProcessManager};
use runner::{LoadTestConfig, RunReport, Runbook, RunnerConfig, RunnerError, RunnerResult, ToolNames};
use shared::manifest::{DEFAULT_APP_NAME, DEFAULT_IMAGE, DEFAULT_SERVICE_NAME};
use shared::{KeyValuePair, ProcessId, logging, process_debug, process_info};

/// Local cluster runbook for the messaging app
#[derive(Parser)]
#[command(name = "runner")]
#[command(about = "Brings up a local cluster, scales the messaging app and load tests it")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUNNER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Deployment name (also the pods' `app` label)
    #[arg(long, global = true, env = "RUNNER_DEPLOYMENT", default_value = DEFAULT_APP_NAME)]
    pub deployment: String,

    /// Service exposing the deployment
    #[arg(long, global = true, env = "RUNNER_SERVICE", default_value = DEFAULT_SERVICE_NAME)]
    pub service: String,

    /// Container image written into the manifest
    #[arg(long, global = true, env = "RUNNER_IMAGE", default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Replica count requested by the scale step
    #[arg(long, global = true, env = "RUNNER_REPLICAS", default_value_t = 3)]
    pub replicas: u32,

    /// Replica count written into the applied manifest
    #[arg(long, global = true, env = "RUNNER_INITIAL_REPLICAS", default_value_t = 1)]
    pub initial_replicas: u32,

    /// Container and service port
    #[arg(long, global = true, env = "RUNNER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Extra container environment variable, KEY=VALUE (repeatable)
    #[arg(long = "env", global = true, value_name = "KEY=VALUE")]
    pub extra_env: Vec<KeyValuePair>,

    /// Load test threads
    #[arg(long, global = true, env = "RUNNER_WRK_THREADS", default_value_t = 4)]
    pub threads: u32,

    /// Load test open connections
    #[arg(long, global = true, env = "RUNNER_WRK_CONNECTIONS", default_value_t = 100)]
    pub connections: u32,

    /// Load test duration in seconds
    #[arg(long, global = true, env = "RUNNER_WRK_DURATION", default_value_t = 30)]
    pub duration_secs: u64,

    /// Seconds to let the port-forward settle before the load test
    #[arg(long, global = true, env = "RUNNER_WARMUP", default_value_t = 5)]
    pub warmup_secs: u64,

    /// Local port the service is forwarded to
    #[arg(long, global = true, env = "RUNNER_LOCAL_PORT", default_value_t = 8000)]
    pub local_port: u16,

    /// Request path for the load test
    #[arg(long, global = true, env = "RUNNER_WRK_PATH", default_value = "/")]
    pub path: String,

    /// kubectl executable
    #[arg(long, global = true, env = "RUNNER_KUBECTL", default_value = "kubectl")]
    pub kubectl: String,

    /// minikube executable
    #[arg(long, global = true, env = "RUNNER_MINIKUBE", default_value = "minikube")]
    pub minikube: String,

    /// wrk executable
    #[arg(long, global = true, env = "RUNNER_WRK", default_value = "wrk")]
    pub wrk: String,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Start the cluster, check connectivity, list pods
    Setup,
    /// Apply the deployment and service manifest
    Apply,
    /// Scale, wait for rollout, load test, read resource usage
    Scale,
    /// Setup, apply and scale in one go
    All,
    /// Print (or write) the rendered manifest without touching the cluster
    Manifest {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl Args {
    fn to_config(&self) -> RunnerConfig {
        RunnerConfig {
            deployment: self.deployment.clone(),
            service: self.service.clone(),
            image: self.image.clone(),
            replicas: self.replicas,
            initial_replicas: self.initial_replicas,
            port: self.port,
            extra_env: self.extra_env.clone(),
            load_test: LoadTestConfig {
                threads: self.threads,
                connections: self.connections,
                duration: Duration::from_secs(self.duration_secs),
                warmup: Duration::from_secs(self.warmup_secs),
                local_port: self.local_port,
                path: self.path.clone(),
            },
            tools: ToolNames {
                kubectl: self.kubectl.clone(),
                minikube: self.minikube.clone(),
                wrk: self.wrk.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Environment fallbacks for the flags above
    dotenv::dotenv().ok();

    let args = Args::parse();

    ProcessId::init_runner();
    logging::init_tracing_with_level(Some(&args.log_level));

    let result = run(args).await;
    if let Err(e) = &result {
        logging::log_error(ProcessId::current(), "runner", e);
    }
    ExitCode::from(runner::exit_code(&result))
}

async fn run(args: Args) -> RunnerResult<()> {
    let config = args.to_config();
    config.validate()?;
    process_debug!(ProcessId::current(), "Configuration: {:?}", config);

    let command = args.command.clone();
    if let Commands::Manifest { output } = &command {
        return write_manifest(&config, output.as_ref());
    }

    let runbook = Runbook::new(
        config,
        PathToolLocator::new(),
        RealCommandRunner::new(),
        RealProcessManager::new(),
    );
    let mut report = RunReport::new();

    let result = tokio::select! {
        result = execute(&runbook, &command, &mut report) => result,
        _ = signal::ctrl_c() => {
            logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal");
            Err(RunnerError::Interrupted { reason: "Ctrl+C".to_string() })
        }
    };

    // No-op unless the run was cut short while a helper was alive
    if let Err(e) = runbook.shutdown().await {
        logging::log_error(ProcessId::current(), "Helper cleanup", &e);
    }

    report.log_summary();
    result
}

async fn execute(
    runbook: &Runbook<PathToolLocator, RealCommandRunner, RealProcessManager>,
    command: &Commands,
    report: &mut RunReport,
) -> RunnerResult<()> {
    match command {
        Commands::Setup => runbook.run_setup(report).await,
        Commands::Apply => runbook.run_apply(report).await,
        Commands::Scale => runbook.run_scale(report).await,
        Commands::All => runbook.run_all(report).await,
        Commands::Manifest { .. } => Ok(()),
    }
}

fn write_manifest(config: &RunnerConfig, output: Option<&PathBuf>) -> RunnerResult<()> {
    let rendered = config.manifest().render()?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))?;
            process_info!(ProcessId::current(), "📝 Manifest written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
