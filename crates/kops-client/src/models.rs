//! Wire types for kops CLI output

use serde::{Deserialize, Serialize};

/// Identifies a cluster within the configured state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterParams {
    /// Fully-qualified cluster name (e.g. `demo.example.com`)
    pub name: String,
}

impl ClusterParams {
    /// Creates params for the given cluster name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Result of `kops validate cluster -o json`.
///
/// A ready cluster reports nodes and no failures. A converging cluster
/// reports failures (nodes may or may not be present alongside them).
/// Neither list present is an unexpected result the caller must not
/// treat as ready.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ValidationStatus {
    /// Reasons the cluster is not ready
    #[serde(default)]
    pub failures: Vec<ValidationFailure>,

    /// Per-node status records
    #[serde(default)]
    pub nodes: Vec<ValidationNode>,
}

/// One validation failure record.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ValidationFailure {
    /// Failure kind (serialized as `type` on the wire)
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

/// One node record from a validation run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ValidationNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub status: String,
}

/// Kubeconfig exported by `kops export kubecfg`, decoded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct KubeConfig {
    #[serde(default, rename = "apiVersion")]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, rename = "current-context")]
    pub current_context: String,
    #[serde(default)]
    pub clusters: Vec<NamedClusterEndpoint>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
}

/// kubeconfig `clusters` list entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NamedClusterEndpoint {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster: ClusterEndpoint,
}

/// API server endpoint and CA material.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClusterEndpoint {
    #[serde(default, rename = "certificate-authority-data")]
    pub certificate_authority_data: String,
    #[serde(default)]
    pub server: String,
}

/// kubeconfig `contexts` list entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NamedContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub context: ContextRef,
}

/// Cluster/user pairing for a kubeconfig context.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ContextRef {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub user: String,
}

/// kubeconfig `users` list entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NamedUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user: UserCredentials,
}

/// Client credential material.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserCredentials {
    #[serde(default, rename = "client-certificate-data")]
    pub client_certificate_data: String,
    #[serde(default, rename = "client-key-data")]
    pub client_key_data: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
