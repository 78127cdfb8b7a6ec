//! Declarative descriptors submitted to the cluster
//!
//! The runner never mutates these after submission; the cluster owns them.
//! They render to `apps/v1 Deployment` and `v1 Service` objects wrapped in a
//! `v1 List`, which `kubectl apply -f` accepts as JSON.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::{SharedError, SharedResult};
use crate::types::KeyValuePair;

pub const DEFAULT_APP_NAME: &str = "messaging-app";
pub const DEFAULT_SERVICE_NAME: &str = "messaging-app-service";
pub const DEFAULT_IMAGE: &str = "messaging-app:latest";
pub const DEFAULT_PORT: u16 = 8000;
pub const SETTINGS_MODULE_VAR: &str = "DJANGO_SETTINGS_MODULE";
pub const DEFAULT_SETTINGS_MODULE: &str = "messaging_app.settings";

/// Replicated workload record
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentDescriptor {
    pub name: String,
    pub replicas: u32,
    pub image: String,
    pub container_port: u16,
    pub env: Vec<KeyValuePair>,
}

impl Default for DeploymentDescriptor {
    fn default() -> Self {
        Self {
            name: DEFAULT_APP_NAME.to_string(),
            replicas: 1,
            image: DEFAULT_IMAGE.to_string(),
            container_port: DEFAULT_PORT,
            env: vec![KeyValuePair::new(SETTINGS_MODULE_VAR, DEFAULT_SETTINGS_MODULE)],
        }
    }
}

impl DeploymentDescriptor {
    /// Label selector shared by the pods and the service
    pub fn app_label(&self) -> &str {
        &self.name
    }

    pub fn validate(&self) -> SharedResult<()> {
        validate_resource_name("deployment name", &self.name)?;
        self.replica_count()?;
        if self.image.trim().is_empty() {
            return Err(invalid("container image must not be empty"));
        }
        if self.container_port == 0 {
            return Err(invalid("container port must be between 1 and 65535"));
        }
        for pair in &self.env {
            if pair.key.trim().is_empty() {
                return Err(invalid("environment variable names must not be empty"));
            }
        }
        Ok(())
    }

    fn replica_count(&self) -> SharedResult<i32> {
        i32::try_from(self.replicas).map_err(|_| invalid(&format!("replica count {} is out of range", self.replicas)))
    }

    pub fn to_resource(&self) -> SharedResult<Deployment> {
        let env = self
            .env
            .iter()
            .map(|pair| EnvVar {
                name: pair.key.clone(),
                value: Some(pair.value.clone()),
                ..Default::default()
            })
            .collect();

        let container = Container {
            name: self.name.clone(),
            image: Some(self.image.clone()),
            ports: Some(vec![ContainerPort {
                container_port: i32::from(self.container_port),
                ..Default::default()
            }]),
            env: Some(env),
            ..Default::default()
        };

        Ok(Deployment {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                labels: Some(app_labels(self.app_label())),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(self.replica_count()?),
                selector: LabelSelector {
                    match_labels: Some(app_labels(self.app_label())),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(app_labels(self.app_label())),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![container],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

/// Stable, cluster-internal network identity for the deployment's pods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub selector: String,
    pub port: u16,
    pub target_port: u16,
}

impl Default for ServiceDescriptor {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVICE_NAME.to_string(),
            selector: DEFAULT_APP_NAME.to_string(),
            port: DEFAULT_PORT,
            target_port: DEFAULT_PORT,
        }
    }
}

impl ServiceDescriptor {
    pub fn validate(&self) -> SharedResult<()> {
        validate_resource_name("service name", &self.name)?;
        if self.port == 0 || self.target_port == 0 {
            return Err(invalid("service ports must be between 1 and 65535"));
        }
        Ok(())
    }

    /// ClusterIP only: reachable from inside the cluster or through a port-forward
    pub fn to_resource(&self) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".to_string()),
                selector: Some(app_labels(&self.selector)),
                ports: Some(vec![ServicePort {
                    protocol: Some("TCP".to_string()),
                    port: i32::from(self.port),
                    target_port: Some(IntOrString::Int(i32::from(self.target_port))),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// `v1 List` envelope; k8s-openapi objects carry their own apiVersion and kind
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceList {
    api_version: &'static str,
    kind: &'static str,
    items: Vec<ListItem>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ListItem {
    Deployment(Box<Deployment>),
    Service(Box<Service>),
}

/// Deployment plus the service exposing it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub deployment: DeploymentDescriptor,
    pub service: ServiceDescriptor,
}

impl Manifest {
    pub fn new(deployment: DeploymentDescriptor, service: ServiceDescriptor) -> Self {
        Self { deployment, service }
    }

    pub fn validate(&self) -> SharedResult<()> {
        self.deployment.validate()?;
        self.service.validate()?;
        if self.service.selector != self.deployment.app_label() {
            return Err(invalid(&format!(
                "service selector '{}' does not match deployment label '{}'",
                self.service.selector,
                self.deployment.app_label()
            )));
        }
        if self.service.target_port != self.deployment.container_port {
            return Err(invalid(&format!(
                "service target port {} does not match container port {}",
                self.service.target_port, self.deployment.container_port
            )));
        }
        Ok(())
    }

    fn to_list(&self) -> SharedResult<ResourceList> {
        Ok(ResourceList {
            api_version: "v1",
            kind: "List",
            items: vec![
                ListItem::Deployment(Box::new(self.deployment.to_resource()?)),
                ListItem::Service(Box::new(self.service.to_resource())),
            ],
        })
    }

    pub fn to_value(&self) -> SharedResult<Value> {
        serde_json::to_value(self.to_list()?).map_err(serialization)
    }

    /// Validated, pretty-printed JSON ready for `kubectl apply -f`
    pub fn render(&self) -> SharedResult<String> {
        self.validate()?;
        serde_json::to_string_pretty(&self.to_list()?).map_err(serialization)
    }
}

fn app_labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), app.to_string())])
}

fn serialization(e: serde_json::Error) -> SharedError {
    SharedError::SerializationError { message: e.to_string() }
}

fn invalid(message: &str) -> SharedError {
    SharedError::InvalidManifest {
        message: message.to_string(),
    }
}

/// RFC 1123 label: lowercase alphanumerics and '-', at most 63 chars
fn validate_resource_name(what: &str, name: &str) -> SharedResult<()> {
    let valid_chars = name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = !name.starts_with('-') && !name.ends_with('-');

    if name.is_empty() || name.len() > 63 || !valid_chars || !valid_edges {
        return Err(invalid(&format!("{what} '{name}' is not a valid resource name")));
    }
    Ok(())
}
