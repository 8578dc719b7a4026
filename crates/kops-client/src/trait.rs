//! KopsClient trait for mocking
//!
//! Abstracts the kops CLI client so reconcilers can be unit tested
//! against an in-memory implementation. All methods are `Send` to work
//! with Tokio's work-stealing runtime.

use crate::error::KopsError;
use crate::models::{ClusterParams, KubeConfig, ValidationStatus};

/// Cluster lifecycle operations backed by the kops CLI.
#[async_trait::async_trait]
pub trait KopsClientTrait: Send + Sync {
    /// Writes `manifest` to a scratch file and replaces the cluster
    /// definition in the state store, creating it if absent. Idempotent;
    /// no cluster nodes are affected.
    async fn replace_cluster(&self, name: &str, manifest: &str) -> Result<(), KopsError>;

    /// Applies configuration drift to cloud resources. No-op in
    /// development mode.
    async fn update_cluster(&self, params: &ClusterParams) -> Result<(), KopsError>;

    /// Recycles instances to apply changes that require recreation.
    /// Ensures a local kubeconfig first. No-op in development mode.
    async fn rolling_update_cluster(&self, params: &ClusterParams) -> Result<(), KopsError>;

    /// Validates the cluster, returning per-node status or failure
    /// records. Development mode returns a canned single-master ready
    /// status without invoking anything.
    async fn validate_cluster(&self, params: &ClusterParams) -> Result<ValidationStatus, KopsError>;

    /// Exports and decodes the cluster kubeconfig. Development mode
    /// returns an empty config.
    async fn get_kube_config(&self, params: &ClusterParams) -> Result<KubeConfig, KopsError>;

    /// Tears the cluster down. Not guaranteed idempotent by kops;
    /// callers must tolerate a not-found failure on repeat invocation.
    async fn delete_cluster(&self, params: &ClusterParams) -> Result<(), KopsError>;

    /// Whether the cluster exists in the state store.
    async fn get_cluster(&self, params: &ClusterParams) -> Result<bool, KopsError>;

    /// Names of all clusters in the state store.
    async fn list_clusters(&self) -> Result<Vec<String>, KopsError>;
}
