//! Shared types for the cluster operations runner
//!
//! Holds the pieces every crate in the workspace needs: the process identity
//! used in log lines, the logging macros, the shared error type and the
//! declarative manifest descriptors submitted to the cluster.

pub mod errors;
pub mod logging;
pub mod manifest;
pub mod types;

pub use errors::*;
pub use manifest::{DeploymentDescriptor, Manifest, ServiceDescriptor};
pub use types::*;
