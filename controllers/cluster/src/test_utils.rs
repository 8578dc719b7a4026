//! Test utilities for unit testing reconcilers
//!
//! Factories for Cluster resources in the shapes the reconciler has to
//! distinguish: fresh, mid-provisioning, and being deleted.

use crds::{Cluster, ClusterPhase, ClusterSpec, ClusterStatus, KopsConfig};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

/// A fresh Cluster with no status, as the API server hands it to us
/// right after creation.
pub fn test_cluster(name: &str) -> Cluster {
    Cluster {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: ClusterSpec {
            name: name.to_string(),
            config: "apiVersion: kops.k8s.io/v1alpha2\nkind: Cluster\n".to_string(),
            kops_config: KopsConfig::default(),
        },
        status: None,
    }
}

/// A Cluster with a recorded phase.
pub fn test_cluster_with_phase(name: &str, phase: ClusterPhase) -> Cluster {
    let mut cluster = test_cluster(name);
    cluster.status = Some(ClusterStatus {
        phase: Some(phase),
        ..Default::default()
    });
    cluster
}

/// A Cluster marked for deletion carrying the given finalizers.
pub fn deleting_cluster(name: &str, finalizers: &[&str]) -> Cluster {
    let mut cluster = test_cluster(name);
    cluster.metadata.deletion_timestamp = Some(deletion_time());
    cluster.metadata.finalizers = if finalizers.is_empty() {
        None
    } else {
        Some(finalizers.iter().map(ToString::to_string).collect())
    };
    cluster
}

fn deletion_time() -> Time {
    serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap()
}
