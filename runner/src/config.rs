//! Runner configuration
//!
//! Collected from command-line flags (with `.env`/environment fallbacks) and
//! validated once before any external tool is invoked.

use std::time::Duration;

use shared::manifest::{
    DEFAULT_APP_NAME, DEFAULT_IMAGE, DEFAULT_PORT, DEFAULT_SERVICE_NAME, DEFAULT_SETTINGS_MODULE, SETTINGS_MODULE_VAR,
};
use shared::{DeploymentDescriptor, KeyValuePair, Manifest, ServiceDescriptor};

use crate::error::{RunnerError, RunnerResult};

/// Executable names for the external tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolNames {
    pub kubectl: String,
    pub minikube: String,
    pub wrk: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            minikube: "minikube".to_string(),
            wrk: "wrk".to_string(),
        }
    }
}

/// Fixed parameters of the load-test window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTestConfig {
    pub threads: u32,
    pub connections: u32,
    pub duration: Duration,
    /// Pause between launching the port-forward and starting the load test
    pub warmup: Duration,
    /// Local port the service is forwarded to
    pub local_port: u16,
    /// Request path appended to the forwarded address
    pub path: String,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            connections: 100,
            duration: Duration::from_secs(30),
            warmup: Duration::from_secs(5),
            local_port: DEFAULT_PORT,
            path: "/".to_string(),
        }
    }
}

impl LoadTestConfig {
    pub fn target_url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("http://127.0.0.1:{}{}", self.local_port, path)
    }
}

/// Everything the runbook needs to drive the cluster
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub deployment: String,
    pub service: String,
    pub image: String,
    /// Replica count requested by the scale step
    pub replicas: u32,
    /// Replica count written into the applied manifest
    pub initial_replicas: u32,
    pub port: u16,
    pub extra_env: Vec<KeyValuePair>,
    pub load_test: LoadTestConfig,
    pub tools: ToolNames,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            deployment: DEFAULT_APP_NAME.to_string(),
            service: DEFAULT_SERVICE_NAME.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            replicas: 3,
            initial_replicas: 1,
            port: DEFAULT_PORT,
            extra_env: Vec::new(),
            load_test: LoadTestConfig::default(),
            tools: ToolNames::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> RunnerResult<()> {
        if self.replicas == 0 {
            return Err(RunnerError::config("replicas must be at least 1"));
        }
        if self.initial_replicas == 0 {
            return Err(RunnerError::config("initial replicas must be at least 1"));
        }
        if self.port == 0 {
            return Err(RunnerError::config("port must be between 1 and 65535"));
        }

        let load = &self.load_test;
        if load.threads == 0 {
            return Err(RunnerError::config("load test threads must be at least 1"));
        }
        if load.connections < load.threads {
            return Err(RunnerError::config(format!(
                "load test connections ({}) must be >= threads ({})",
                load.connections, load.threads
            )));
        }
        if load.duration < Duration::from_secs(1) {
            return Err(RunnerError::config("load test duration must be at least 1s"));
        }
        if load.local_port == 0 {
            return Err(RunnerError::config("local port must be between 1 and 65535"));
        }

        for (name, tool) in [
            ("kubectl", &self.tools.kubectl),
            ("minikube", &self.tools.minikube),
            ("wrk", &self.tools.wrk),
        ] {
            if tool.trim().is_empty() {
                return Err(RunnerError::config(format!("{name} executable must not be empty")));
            }
        }

        self.manifest().validate()?;
        Ok(())
    }

    /// Deployment and service descriptors derived from this configuration
    pub fn manifest(&self) -> Manifest {
        let mut env = vec![KeyValuePair::new(SETTINGS_MODULE_VAR, DEFAULT_SETTINGS_MODULE)];
        for pair in &self.extra_env {
            match env.iter_mut().find(|existing| existing.key == pair.key) {
                Some(existing) => existing.value = pair.value.clone(),
                None => env.push(pair.clone()),
            }
        }

        let deployment = DeploymentDescriptor {
            name: self.deployment.clone(),
            replicas: self.initial_replicas,
            image: self.image.clone(),
            container_port: self.port,
            env,
        };
        let service = ServiceDescriptor {
            name: self.service.clone(),
            selector: self.deployment.clone(),
            port: self.port,
            target_port: self.port,
        };
        Manifest::new(deployment, service)
    }
}
