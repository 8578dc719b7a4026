//! Controller-specific error types.

use kops_client::KopsError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Cluster Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// kops invocation error
    #[error("kops error: {0}")]
    Kops(#[from] KopsError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource missing required metadata (name/namespace)
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    /// Status/spec patch could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Admission server failed
    #[error("Admission server error: {0}")]
    Admission(String),
}
