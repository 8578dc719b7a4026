//! Mock KopsClient for unit testing
//!
//! In-memory implementation of `KopsClientTrait` that records an
//! imitation state store keyed by cluster name, so reconciler tests can
//! run without the kops binary or cloud credentials.
//!
//! Validation results are queued per cluster; an empty queue yields an
//! empty status (the "unexpected result" branch). Delete fails with the
//! not-found exit-code contract when the cluster is absent, matching
//! the real tool's non-idempotent delete.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::KopsError;
use crate::kops_trait::KopsClientTrait;
use crate::models::{ClusterParams, KubeConfig, ValidationStatus};

/// State-store entry tracked per cluster.
#[derive(Debug, Clone, Default)]
pub struct MockClusterState {
    /// Manifest content from the last replace
    pub manifest: String,
    /// How many times replace was invoked
    pub replace_count: u32,
    /// Whether update ran against this cluster
    pub updated: bool,
    /// Whether rolling-update ran against this cluster
    pub rolled: bool,
}

/// Mock kops client for testing.
#[derive(Clone, Default)]
pub struct MockKopsClient {
    clusters: Arc<Mutex<HashMap<String, MockClusterState>>>,
    validations: Arc<Mutex<HashMap<String, VecDeque<ValidationStatus>>>>,
    kube_configs: Arc<Mutex<HashMap<String, KubeConfig>>>,
    fail_verbs: Arc<Mutex<HashMap<String, (Option<i32>, String)>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockKopsClient {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a cluster into the imitation state store (for test setup).
    pub fn add_cluster(&self, name: &str, manifest: &str) {
        self.clusters.lock().unwrap().insert(
            name.to_string(),
            MockClusterState {
                manifest: manifest.to_string(),
                ..Default::default()
            },
        );
    }

    /// Queues a validation result for a cluster (for test setup).
    pub fn queue_validation(&self, name: &str, status: ValidationStatus) {
        self.validations
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(status);
    }

    /// Sets the kubeconfig returned for a cluster (for test setup).
    pub fn set_kube_config(&self, name: &str, config: KubeConfig) {
        self.kube_configs
            .lock()
            .unwrap()
            .insert(name.to_string(), config);
    }

    /// Makes the named verb fail with the given exit code and stderr.
    pub fn fail_verb(&self, verb: &str, code: Option<i32>, stderr: &str) {
        self.fail_verbs
            .lock()
            .unwrap()
            .insert(verb.to_string(), (code, stderr.to_string()));
    }

    /// Snapshot of a cluster's state-store entry.
    pub fn cluster(&self, name: &str) -> Option<MockClusterState> {
        self.clusters.lock().unwrap().get(name).cloned()
    }

    /// Ordered log of invoked operations, as `"<verb> <name>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, verb: &str, name: &str) -> Result<(), KopsError> {
        self.calls.lock().unwrap().push(format!("{verb} {name}"));
        if let Some((code, stderr)) = self.fail_verbs.lock().unwrap().get(verb) {
            return Err(KopsError::Command {
                description: verb.to_string(),
                code: *code,
                stderr: stderr.clone(),
            });
        }
        Ok(())
    }

    fn not_found(verb: &str, name: &str) -> KopsError {
        KopsError::Command {
            description: verb.to_string(),
            code: Some(1),
            stderr: format!("cluster not found \"{name}\""),
        }
    }
}

#[async_trait::async_trait]
impl KopsClientTrait for MockKopsClient {
    async fn replace_cluster(&self, name: &str, manifest: &str) -> Result<(), KopsError> {
        self.record("replace", name)?;
        let mut clusters = self.clusters.lock().unwrap();
        let entry = clusters.entry(name.to_string()).or_default();
        entry.manifest = manifest.to_string();
        entry.replace_count += 1;
        Ok(())
    }

    async fn update_cluster(&self, params: &ClusterParams) -> Result<(), KopsError> {
        self.record("update", &params.name)?;
        let mut clusters = self.clusters.lock().unwrap();
        match clusters.get_mut(&params.name) {
            Some(entry) => {
                entry.updated = true;
                Ok(())
            }
            None => Err(Self::not_found("update", &params.name)),
        }
    }

    async fn rolling_update_cluster(&self, params: &ClusterParams) -> Result<(), KopsError> {
        self.record("rolling-update", &params.name)?;
        let mut clusters = self.clusters.lock().unwrap();
        match clusters.get_mut(&params.name) {
            Some(entry) => {
                entry.rolled = true;
                Ok(())
            }
            None => Err(Self::not_found("rolling-update", &params.name)),
        }
    }

    async fn validate_cluster(&self, params: &ClusterParams) -> Result<ValidationStatus, KopsError> {
        self.record("validate", &params.name)?;
        let queued = self
            .validations
            .lock()
            .unwrap()
            .get_mut(&params.name)
            .and_then(VecDeque::pop_front);
        Ok(queued.unwrap_or_default())
    }

    async fn get_kube_config(&self, params: &ClusterParams) -> Result<KubeConfig, KopsError> {
        self.record("export-kubecfg", &params.name)?;
        let configs = self.kube_configs.lock().unwrap();
        Ok(configs.get(&params.name).cloned().unwrap_or_default())
    }

    async fn delete_cluster(&self, params: &ClusterParams) -> Result<(), KopsError> {
        self.record("delete", &params.name)?;
        let mut clusters = self.clusters.lock().unwrap();
        if clusters.remove(&params.name).is_some() {
            Ok(())
        } else {
            Err(Self::not_found("delete", &params.name))
        }
    }

    async fn get_cluster(&self, params: &ClusterParams) -> Result<bool, KopsError> {
        self.record("get", &params.name)?;
        Ok(self.clusters.lock().unwrap().contains_key(&params.name))
    }

    async fn list_clusters(&self) -> Result<Vec<String>, KopsError> {
        self.record("get", "*")?;
        let mut names: Vec<String> = self.clusters.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replace_is_idempotent() {
        let mock = MockKopsClient::new();
        let manifest = "apiVersion: kops.k8s.io/v1alpha2\nkind: Cluster\n";

        mock.replace_cluster("demo.example.com", manifest).await.unwrap();
        let first = mock.cluster("demo.example.com").unwrap();

        // Second identical call: no error, state indistinguishable
        // apart from the invocation count.
        mock.replace_cluster("demo.example.com", manifest).await.unwrap();
        let second = mock.cluster("demo.example.com").unwrap();

        assert_eq!(first.manifest, second.manifest);
        assert_eq!(second.replace_count, 2);
    }

    #[tokio::test]
    async fn delete_of_absent_cluster_is_not_found() {
        let mock = MockKopsClient::new();
        mock.add_cluster("demo.example.com", "manifest");

        let params = ClusterParams::new("demo.example.com");
        mock.delete_cluster(&params).await.unwrap();

        // Repeat deletion mirrors the real tool's non-idempotence.
        let err = mock.delete_cluster(&params).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn validation_queue_drains_in_order() {
        let mock = MockKopsClient::new();
        let failing = ValidationStatus {
            failures: vec![crate::models::ValidationFailure {
                kind: "machine".to_string(),
                name: "i-0abc".to_string(),
                message: "not yet joined".to_string(),
            }],
            nodes: Vec::new(),
        };
        let ready = ValidationStatus {
            failures: Vec::new(),
            nodes: vec![crate::models::ValidationNode {
                name: "ip-10-0-0-1".to_string(),
                ..Default::default()
            }],
        };
        mock.queue_validation("demo.example.com", failing.clone());
        mock.queue_validation("demo.example.com", ready.clone());

        let params = ClusterParams::new("demo.example.com");
        assert_eq!(mock.validate_cluster(&params).await.unwrap(), failing);
        assert_eq!(mock.validate_cluster(&params).await.unwrap(), ready);
        // Drained queue yields the neither-branch status.
        assert_eq!(mock.validate_cluster(&params).await.unwrap(), ValidationStatus::default());
    }

    #[tokio::test]
    async fn fail_verb_overrides_outcome() {
        let mock = MockKopsClient::new();
        mock.add_cluster("demo.example.com", "manifest");
        mock.fail_verb("update", Some(2), "AuthFailure");

        let params = ClusterParams::new("demo.example.com");
        let err = mock.update_cluster(&params).await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("AuthFailure"));
    }
}
