//! Reconciliation logic for the Cluster CRD.
//!
//! Organized as:
//! - `cluster`: reconcile entry point, finalizer gate, persistence
//! - `phases`: the provisioning state machine, pure over the client trait
//! - `defaults`: gap-filling resolver for `spec.kopsConfig`

pub mod cluster;
pub mod defaults;
pub mod phases;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crds::{Cluster, ClusterPhase};
use kops_client::{KopsClientTrait, KubeConfig, ValidationStatus};
use kube::Api;
use tracing::warn;

use crate::backoff::FibonacciBackoff;
use crate::reconciler::defaults::ClusterDefaults;

/// Finalizer token guarding external cluster teardown.
pub(crate) const TEARDOWN_FINALIZER: &str = "clusterops.microscaler.io/teardown";

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(1, 10), // 1 minute min, 10 minutes max
            error_count: 0,
        }
    }
}

/// Reconciles Cluster resources against the kops state store.
pub struct Reconciler {
    pub(crate) kops: Box<dyn KopsClientTrait + Send + Sync>,
    pub(crate) cluster_api: Api<Cluster>,
    pub(crate) defaults: ClusterDefaults,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        kops: impl KopsClientTrait + Send + Sync + 'static,
        cluster_api: Api<Cluster>,
        defaults: ClusterDefaults,
    ) -> Self {
        Self {
            kops: Box::new(kops),
            cluster_api,
            defaults,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Builds the status merge patch for a phase transition.
    ///
    /// When a validation result is present the patch carries the whole
    /// `kopsStatus` object with both arrays explicit, so JSON merge
    /// semantics replace stale failures/nodes wholesale instead of
    /// leaving old entries behind.
    pub(crate) fn cluster_status_patch(
        phase: ClusterPhase,
        kops_status: Option<&ValidationStatus>,
        validated: Option<bool>,
        kubeconfig: Option<&KubeConfig>,
    ) -> serde_json::Value {
        let mut status = serde_json::json!({
            "phase": phase.to_string(),
        });
        if let Some(result) = kops_status {
            status["kopsStatus"] = serde_json::json!({
                "failures": result.failures,
                "nodes": result.nodes,
            });
        }
        if let Some(validated) = validated {
            status["validated"] = serde_json::json!(validated);
        }
        if let Some(config) = kubeconfig {
            status["kubeconfig"] = serde_json::json!(config);
        }
        serde_json::json!({ "status": status })
    }

    /// Get the backoff duration for a resource and advance its
    /// sequence. Returns (backoff_seconds, error_count).
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                (state.backoff.next_backoff_seconds(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (60, 0)
            }
        }
    }

    /// Increment error count for a resource
    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .error_count += 1;
        }
    }

    /// Reset error count for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.error_count = 0;
                state.backoff.reset();
            }
        }
    }

    /// Drop the backoff entry for a resource once it is gone for good,
    /// so the map does not accrete keys for deleted clusters.
    pub fn clear_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }
}

/// Returns the finalizer list with our token appended, or `None` when
/// it is already present.
pub(crate) fn with_teardown_finalizer(existing: &[String]) -> Option<Vec<String>> {
    if existing.iter().any(|token| token == TEARDOWN_FINALIZER) {
        return None;
    }
    let mut updated = existing.to_vec();
    updated.push(TEARDOWN_FINALIZER.to_string());
    Some(updated)
}

/// Returns the finalizer list with our token (and only our token) removed.
pub(crate) fn without_teardown_finalizer(existing: &[String]) -> Vec<String> {
    existing
        .iter()
        .filter(|token| *token != TEARDOWN_FINALIZER)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kops_client::{ValidationFailure, ValidationNode};

    #[test]
    fn finalizer_append_is_idempotent() {
        let updated = with_teardown_finalizer(&[]).unwrap();
        assert_eq!(updated, vec![TEARDOWN_FINALIZER.to_string()]);
        assert!(with_teardown_finalizer(&updated).is_none());
    }

    #[test]
    fn finalizer_removal_leaves_foreign_tokens() {
        let existing = vec![
            "other.io/protect".to_string(),
            TEARDOWN_FINALIZER.to_string(),
            "another.io/hold".to_string(),
        ];
        let remaining = without_teardown_finalizer(&existing);
        assert_eq!(
            remaining,
            vec!["other.io/protect".to_string(), "another.io/hold".to_string()]
        );
    }

    #[test]
    fn status_patch_replaces_kops_status_wholesale() {
        let result = ValidationStatus {
            failures: vec![ValidationFailure {
                kind: "machine".to_string(),
                name: "i-0abc".to_string(),
                message: "not yet joined".to_string(),
            }],
            nodes: Vec::new(),
        };
        let patch = Reconciler::cluster_status_patch(ClusterPhase::Setup, Some(&result), None, None);

        assert_eq!(patch["status"]["phase"], "Setup");
        // Both arrays explicit so a merge patch clears stale entries.
        assert_eq!(patch["status"]["kopsStatus"]["failures"][0]["type"], "machine");
        assert!(patch["status"]["kopsStatus"]["nodes"].as_array().unwrap().is_empty());
        assert!(patch["status"].get("validated").is_none());
        assert!(patch["status"].get("kubeconfig").is_none());
    }

    #[test]
    fn status_patch_done_carries_nodes_and_kubeconfig() {
        let result = ValidationStatus {
            failures: Vec::new(),
            nodes: vec![ValidationNode {
                name: "ip-10-0-0-1".to_string(),
                role: "Master".to_string(),
                ..Default::default()
            }],
        };
        let config = KubeConfig {
            current_context: "demo.example.com".to_string(),
            ..Default::default()
        };
        let patch = Reconciler::cluster_status_patch(
            ClusterPhase::Done,
            Some(&result),
            Some(true),
            Some(&config),
        );

        assert_eq!(patch["status"]["phase"], "Done");
        assert_eq!(patch["status"]["validated"], true);
        assert_eq!(patch["status"]["kubeconfig"]["current-context"], "demo.example.com");
        assert!(patch["status"]["kopsStatus"]["failures"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backoff_advances_per_resource_and_resets() {
        let reconciler = Reconciler::new(
            kops_client::MockKopsClient::new(),
            Api::default_namespaced(test_client()),
            ClusterDefaults {
                dns_zone: "example.com".to_string(),
                state_store: "s3://store".to_string(),
                vpc: String::new(),
            },
        );

        assert_eq!(reconciler.get_backoff_for_resource("default/demo").0, 60);
        assert_eq!(reconciler.get_backoff_for_resource("default/demo").0, 60);
        assert_eq!(reconciler.get_backoff_for_resource("default/demo").0, 120);
        // Independent key starts fresh.
        assert_eq!(reconciler.get_backoff_for_resource("default/other").0, 60);

        reconciler.increment_error("default/demo");
        reconciler.increment_error("default/demo");
        assert_eq!(reconciler.get_backoff_for_resource("default/demo").1, 2);

        reconciler.reset_error("default/demo");
        assert_eq!(reconciler.get_backoff_for_resource("default/demo"), (60, 0));
    }

    #[tokio::test]
    async fn clearing_backoff_removes_the_entry_entirely() {
        let reconciler = Reconciler::new(
            kops_client::MockKopsClient::new(),
            Api::default_namespaced(test_client()),
            ClusterDefaults {
                dns_zone: "example.com".to_string(),
                state_store: "s3://store".to_string(),
                vpc: String::new(),
            },
        );

        reconciler.increment_error("default/demo");
        let _ = reconciler.get_backoff_for_resource("default/demo");
        assert!(reconciler.backoff_states.lock().unwrap().contains_key("default/demo"));

        reconciler.clear_backoff("default/demo");
        assert!(!reconciler.backoff_states.lock().unwrap().contains_key("default/demo"));

        // A later reappearance of the key starts from scratch.
        assert_eq!(reconciler.get_backoff_for_resource("default/demo"), (60, 0));
    }

    fn test_client() -> kube::Client {
        // A client that never connects; backoff tests only need the Api handle.
        let config = kube::Config::new("http://127.0.0.1:8080".parse().unwrap());
        kube::Client::try_from(config).unwrap()
    }
}
