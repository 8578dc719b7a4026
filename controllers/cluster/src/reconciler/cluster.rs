//! Reconcile entry point for Cluster resources.
//!
//! Handles the finalizer gate, first-touch initialization, phase
//! execution and status persistence. The phase semantics themselves
//! live in [`super::phases`].

use std::time::Duration;

use crds::Cluster;
use kops_client::{ClusterParams, KopsClientTrait};
use kube::api::{Patch, PatchParams};
use kube_runtime::controller::Action;
use tracing::{error, info};

use crate::error::ControllerError;
use crate::reconciler::defaults::resolve_kops_config;
use crate::reconciler::phases::{run_phase, Requeue};
use crate::reconciler::{
    with_teardown_finalizer, without_teardown_finalizer, Reconciler, TEARDOWN_FINALIZER,
};

/// Which path a reconcile pass takes for a resource, decided before any
/// API or external call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Track {
    /// Deletion in progress and our finalizer is held: tear down.
    Teardown,
    /// Deletion in progress but our finalizer is gone; nothing to do.
    AwaitForeignFinalizers,
    /// First touch: persist resolved config and enter the state machine.
    Initialize,
    /// Run one step of the state machine from the recorded phase.
    RunPhase(crds::ClusterPhase),
}

/// How a teardown attempt against the state store resolved. Every
/// variant proceeds to finalizer release; none blocks deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TeardownOutcome {
    Deleted,
    AlreadyAbsent,
    Failed,
}

/// Runs the external teardown and classifies the result.
///
/// A cluster already missing from the state store is routine (the
/// resource may never have provisioned, or a prior teardown half
/// finished); any other failure is a state-store leak that gets logged
/// loudly but must not wedge the resource in Terminating.
pub(crate) async fn teardown_cluster(kops: &dyn KopsClientTrait, name: &str) -> TeardownOutcome {
    match kops.delete_cluster(&ClusterParams::new(name)).await {
        Ok(()) => {
            info!("Deleted cluster {}", name);
            TeardownOutcome::Deleted
        }
        Err(e) if e.is_not_found() => {
            info!("Cluster {} already absent from the state store", name);
            TeardownOutcome::AlreadyAbsent
        }
        Err(e) => {
            error!("Failed to tear down cluster {}: {}", name, e);
            TeardownOutcome::Failed
        }
    }
}

/// Classifies a resource. Deletion always wins over phase handling so a
/// cluster mid-provisioning still gets torn down promptly.
pub(crate) fn classify(cluster: &Cluster) -> Track {
    let holds_finalizer = cluster
        .metadata
        .finalizers
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .any(|token| token == TEARDOWN_FINALIZER);

    if cluster.metadata.deletion_timestamp.is_some() {
        if holds_finalizer {
            return Track::Teardown;
        }
        return Track::AwaitForeignFinalizers;
    }

    match cluster.status.as_ref().and_then(|s| s.phase) {
        Some(phase) => Track::RunPhase(phase),
        None => Track::Initialize,
    }
}

impl Reconciler {
    /// Reconciles a single Cluster resource.
    ///
    /// Resources being deleted take the teardown path; everything else
    /// gets the finalizer ensured, is initialized on first touch, and
    /// then runs one step of the provisioning state machine.
    pub async fn reconcile_cluster(&self, cluster: &Cluster) -> Result<Action, ControllerError> {
        let name = cluster
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::MissingMetadata("Cluster missing name".to_string()))?;
        let namespace = cluster.metadata.namespace.as_deref().unwrap_or("default");
        let resource_key = format!("{namespace}/{name}");

        let track = classify(cluster);
        if track == Track::Teardown {
            return self.finalize_cluster(cluster, name, namespace, &resource_key).await;
        }
        if track == Track::AwaitForeignFinalizers {
            return Ok(Action::await_change());
        }

        self.ensure_finalizer(cluster, name, namespace).await?;

        let kops_config = resolve_kops_config(name, &cluster.spec.kops_config, &self.defaults);

        let action = match track {
            Track::RunPhase(phase) => {
                info!("Reconciling Cluster {}/{} in phase {}", namespace, name, phase);

                let transition =
                    run_phase(self.kops.as_ref(), phase, &cluster.spec.config, &kops_config)
                        .await?;

                let status_patch = Self::cluster_status_patch(
                    transition.next_phase,
                    transition.kops_status.as_ref(),
                    transition.validated,
                    transition.kube_config.as_ref(),
                );
                self.cluster_api
                    .patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
                    .await?;

                match transition.requeue {
                    Requeue::Immediate => Action::requeue(Duration::ZERO),
                    Requeue::After(delay) => Action::requeue(delay),
                }
            }
            _ => {
                // First touch: persist the resolved config so users can see
                // the effective values, then enter the state machine.
                info!("Initializing Cluster {}/{} as {}", namespace, name, kops_config.name);
                let spec_patch = serde_json::json!({
                    "spec": { "kopsConfig": kops_config }
                });
                self.cluster_api
                    .patch(name, &PatchParams::default(), &Patch::Merge(&spec_patch))
                    .await?;

                let status_patch = serde_json::json!({
                    "status": { "phase": "Pending" }
                });
                self.cluster_api
                    .patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
                    .await?;

                Action::requeue(Duration::ZERO)
            }
        };

        self.reset_error(&resource_key);
        Ok(action)
    }

    /// Adds the teardown finalizer when it is not yet present.
    async fn ensure_finalizer(
        &self,
        cluster: &Cluster,
        name: &str,
        namespace: &str,
    ) -> Result<(), ControllerError> {
        let existing = cluster.metadata.finalizers.as_deref().unwrap_or(&[]);
        if let Some(updated) = with_teardown_finalizer(existing) {
            info!("Adding finalizer {} to Cluster {}/{}", TEARDOWN_FINALIZER, namespace, name);
            let patch = serde_json::json!({
                "metadata": { "finalizers": updated }
            });
            self.cluster_api
                .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }
        Ok(())
    }

    /// Tears down the external cluster and releases the finalizer.
    ///
    /// The finalizer is removed regardless of the teardown outcome:
    /// a cluster already absent from the state store is logged and
    /// treated as done, and any other teardown error is logged rather
    /// than wedging the resource in Terminating forever.
    async fn finalize_cluster(
        &self,
        cluster: &Cluster,
        name: &str,
        namespace: &str,
        resource_key: &str,
    ) -> Result<Action, ControllerError> {
        let existing = cluster.metadata.finalizers.as_deref().unwrap_or(&[]);
        if !existing.iter().any(|token| token == TEARDOWN_FINALIZER) {
            // Someone else's finalizer is holding the resource.
            return Ok(Action::await_change());
        }

        let kops_config =
            resolve_kops_config(name, &cluster.spec.kops_config, &self.defaults);

        info!("Tearing down cluster {} for {}/{}", kops_config.name, namespace, name);
        // Every outcome releases the finalizer below.
        teardown_cluster(self.kops.as_ref(), &kops_config.name).await;

        let remaining = without_teardown_finalizer(existing);
        let patch = serde_json::json!({
            "metadata": { "finalizers": remaining }
        });
        self.cluster_api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        self.clear_backoff(resource_key);

        Ok(Action::await_change())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{deleting_cluster, test_cluster, test_cluster_with_phase};
    use crds::ClusterPhase;
    use kops_client::MockKopsClient;

    #[test]
    fn fresh_resource_initializes() {
        assert_eq!(classify(&test_cluster("demo")), Track::Initialize);
    }

    #[test]
    fn recorded_phase_runs_the_state_machine() {
        let cluster = test_cluster_with_phase("demo", ClusterPhase::Setup);
        assert_eq!(classify(&cluster), Track::RunPhase(ClusterPhase::Setup));
    }

    #[test]
    fn deletion_wins_over_phase_handling() {
        let mut cluster = deleting_cluster("demo", &[TEARDOWN_FINALIZER]);
        cluster.status = test_cluster_with_phase("demo", ClusterPhase::Update).status;
        assert_eq!(classify(&cluster), Track::Teardown);
    }

    #[test]
    fn deletion_without_our_finalizer_is_left_alone() {
        let cluster = deleting_cluster("demo", &["other.io/protect"]);
        assert_eq!(classify(&cluster), Track::AwaitForeignFinalizers);
    }

    #[test]
    fn deletion_with_no_finalizers_is_left_alone() {
        let cluster = deleting_cluster("demo", &[]);
        assert_eq!(classify(&cluster), Track::AwaitForeignFinalizers);
    }

    #[tokio::test]
    async fn teardown_removes_the_cluster_from_the_state_store() {
        let mock = MockKopsClient::new();
        mock.add_cluster("demo.example.com", "manifest");

        let outcome = teardown_cluster(&mock, "demo.example.com").await;

        assert_eq!(outcome, TeardownOutcome::Deleted);
        assert!(mock.cluster("demo.example.com").is_none());
    }

    #[tokio::test]
    async fn teardown_of_absent_cluster_is_routine() {
        let mock = MockKopsClient::new();

        let outcome = teardown_cluster(&mock, "demo.example.com").await;

        assert_eq!(outcome, TeardownOutcome::AlreadyAbsent);
    }

    #[tokio::test]
    async fn teardown_proceeds_past_a_failing_delete() {
        let mock = MockKopsClient::new();
        mock.add_cluster("demo.example.com", "manifest");
        mock.fail_verb("delete", Some(2), "AuthFailure: credentials expired");

        // The failure is classified, not propagated, so the caller can
        // still release the finalizer.
        let outcome = teardown_cluster(&mock, "demo.example.com").await;

        assert_eq!(outcome, TeardownOutcome::Failed);
        assert_eq!(mock.calls(), vec!["delete demo.example.com".to_string()]);
    }
}
