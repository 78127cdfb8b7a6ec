//! Builders for every external command the runbook issues

use crate::config::{LoadTestConfig, ToolNames};
use crate::traits::Invocation;

/// How `kubectl` is reached on this machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KubectlMode {
    /// `kubectl` is on PATH
    Native,
    /// Only minikube's bundled client is available: `minikube kubectl -- ...`
    ViaMinikube,
}

pub struct CommandSet<'a> {
    tools: &'a ToolNames,
    kubectl_mode: KubectlMode,
}

impl<'a> CommandSet<'a> {
    pub fn new(tools: &'a ToolNames, kubectl_mode: KubectlMode) -> Self {
        Self { tools, kubectl_mode }
    }

    pub fn kubectl_mode(&self) -> KubectlMode {
        self.kubectl_mode
    }

    fn kubectl(&self, args: &[&str]) -> Invocation {
        match self.kubectl_mode {
            KubectlMode::Native => Invocation::new(&self.tools.kubectl, args.iter().copied()),
            KubectlMode::ViaMinikube => Invocation::new(
                &self.tools.minikube,
                ["kubectl", "--"].into_iter().chain(args.iter().copied()),
            ),
        }
    }

    pub fn minikube_start(&self) -> Invocation {
        Invocation::new(&self.tools.minikube, ["start"])
    }

    pub fn minikube_ip(&self) -> Invocation {
        Invocation::new(&self.tools.minikube, ["ip"])
    }

    pub fn cluster_info(&self) -> Invocation {
        self.kubectl(&["cluster-info"])
    }

    pub fn list_all_pods(&self) -> Invocation {
        self.kubectl(&["get", "pods", "--all-namespaces"])
    }

    pub fn list_pods_for(&self, app_label: &str) -> Invocation {
        let selector = format!("app={app_label}");
        self.kubectl(&["get", "pods", "-l", &selector, "-o", "wide"])
    }

    pub fn apply(&self, manifest_path: &str) -> Invocation {
        self.kubectl(&["apply", "-f", manifest_path])
    }

    pub fn scale(&self, deployment: &str, replicas: u32) -> Invocation {
        let target = format!("deployment/{deployment}");
        let replicas = format!("--replicas={replicas}");
        self.kubectl(&["scale", &target, &replicas])
    }

    pub fn rollout_status(&self, deployment: &str) -> Invocation {
        let target = format!("deployment/{deployment}");
        self.kubectl(&["rollout", "status", &target])
    }

    pub fn service_port(&self, service: &str) -> Invocation {
        self.kubectl(&["get", "service", service, "-o", "jsonpath={.spec.ports[0].port}"])
    }

    pub fn port_forward(&self, service: &str, local_port: u16, remote_port: u16) -> Invocation {
        let target = format!("service/{service}");
        let ports = format!("{local_port}:{remote_port}");
        self.kubectl(&["port-forward", &target, &ports, "--address", "127.0.0.1"])
    }

    pub fn top_pods(&self) -> Invocation {
        self.kubectl(&["top", "pods"])
    }

    pub fn load_test(&self, load: &LoadTestConfig) -> Invocation {
        Invocation::new(
            &self.tools.wrk,
            [
                format!("-t{}", load.threads),
                format!("-c{}", load.connections),
                format!("-d{}s", load.duration.as_secs()),
                load.target_url(),
            ],
        )
    }
}
