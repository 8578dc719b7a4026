//! Cluster CRD
//!
//! Desired state for a kops-provisioned Kubernetes cluster on AWS.
//! The operator watches this resource and drives the external kops
//! tooling until the target cluster is running.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "clusterops.microscaler.io",
    version = "v1alpha1",
    kind = "Cluster",
    plural = "clusters",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Desired cluster name. Immutable once set; enforced by the
    /// admission boundary, not by the reconciler.
    pub name: String,

    /// Full multi-document kops cluster manifest. Fed verbatim to
    /// `kops replace cluster -f`.
    #[serde(default)]
    pub config: String,

    /// Structured override for the kops cluster parameters. Unset
    /// fields are filled with operator-level defaults on first
    /// reconcile.
    #[serde(default)]
    pub kops_config: KopsConfig,
}

/// Structured kops cluster parameters.
///
/// Each field defaults individually when absent or zero-valued;
/// defaulting never overwrites an explicitly set value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KopsConfig {
    /// Fully-qualified cluster name (`<resource name>.<dns zone>`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Number of master nodes
    #[serde(default)]
    pub master_count: i32,

    /// EC2 instance type for masters
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub master_ec2: String,

    /// Number of worker nodes
    #[serde(default)]
    pub worker_count: i32,

    /// EC2 instance type for workers
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub worker_ec2: String,

    /// kops state store URI (e.g. `s3://bucket`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state_store: String,

    /// AWS VPC identifier
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vpc: String,

    /// Availability zones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

/// Coarse-grained stage of cluster provisioning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ClusterPhase {
    /// Desired state not yet written to the kops state store
    Pending,
    /// State store written; cloud resources not yet converged
    Update,
    /// Cloud update issued; waiting for the cluster to validate
    Setup,
    /// Cluster validated and ready
    Done,
}

impl std::fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterPhase::Pending => write!(f, "Pending"),
            ClusterPhase::Update => write!(f, "Update"),
            ClusterPhase::Setup => write!(f, "Setup"),
            ClusterPhase::Done => write!(f, "Done"),
        }
    }
}

/// Latest kops validation outcome, copied verbatim from the tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct KopsStatus {
    /// Reasons the cluster is not ready
    #[serde(default)]
    pub failures: Vec<KopsFailure>,

    /// Per-node status once the cluster is up
    #[serde(default)]
    pub nodes: Vec<KopsNode>,
}

/// One reason the cluster is not ready.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct KopsFailure {
    /// Failure kind as reported by kops
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

/// One cluster node as reported by kops validation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KopsNode {
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

/// Credentials and endpoint for the provisioned cluster, parsed from
/// the kubeconfig kops exports. Opaque to the reconciler beyond
/// store-and-forward into status.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct KubeConfig {
    #[serde(default, rename = "apiVersion", skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, rename = "current-context", skip_serializing_if = "String::is_empty")]
    pub current_context: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<NamedClusterEndpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<NamedContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<NamedUser>,
}

/// kubeconfig `clusters` list entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct NamedClusterEndpoint {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster: ClusterEndpoint,
}

/// API endpoint of a provisioned cluster.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ClusterEndpoint {
    #[serde(
        default,
        rename = "certificate-authority-data",
        skip_serializing_if = "String::is_empty"
    )]
    pub certificate_authority_data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,
}

/// kubeconfig `contexts` list entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct NamedContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub context: ContextRef,
}

/// Cluster/user pairing inside a kubeconfig context.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ContextRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
}

/// kubeconfig `users` list entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct NamedUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user: UserCredentials,
}

/// Client credential material for a provisioned cluster.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct UserCredentials {
    #[serde(
        default,
        rename = "client-certificate-data",
        skip_serializing_if = "String::is_empty"
    )]
    pub client_certificate_data: String,
    #[serde(default, rename = "client-key-data", skip_serializing_if = "String::is_empty")]
    pub client_key_data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

/// Observed state of a Cluster resource. Mutated only by the
/// reconciler via the status subresource.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Provisioning phase; unset until the first reconcile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ClusterPhase>,

    /// Latest validation outcome
    #[serde(default)]
    pub kops_status: KopsStatus,

    /// True once validation reported ready nodes with no failures
    #[serde(default)]
    pub validated: bool,

    /// Credentials for the provisioned cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<KubeConfig>,
}
