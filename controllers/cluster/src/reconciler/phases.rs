//! Cluster provisioning state machine.
//!
//! Each reconcile runs at most one phase step against the kops client
//! and reports the resulting transition; persistence and requeue wiring
//! live in the reconcile entry point. Keeping the steps pure over the
//! client trait makes the machine testable with the mock client.

use std::time::Duration;

use crds::{ClusterPhase, KopsConfig};
use kops_client::{ClusterParams, KopsClientTrait, KopsError, KubeConfig, ValidationStatus};
use tracing::{info, warn};

/// Delay between validation attempts while the cluster converges.
const SETUP_RETRY_DELAY: Duration = Duration::from_secs(60);
/// Drift-check interval once the cluster is validated.
const DONE_REQUEUE_DELAY: Duration = Duration::from_secs(600);

/// How soon the resource should be reconciled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Requeue right away to run the next phase.
    Immediate,
    /// Requeue after a fixed delay.
    After(Duration),
}

/// Outcome of a single phase step.
#[derive(Debug)]
pub struct Transition {
    pub next_phase: ClusterPhase,
    /// Validation result to record, replacing `status.kopsStatus` wholesale.
    pub kops_status: Option<ValidationStatus>,
    /// Exported kubeconfig to record on the status.
    pub kube_config: Option<KubeConfig>,
    /// New value for `status.validated`, when it changed.
    pub validated: Option<bool>,
    pub requeue: Requeue,
}

impl Transition {
    fn to_phase(next_phase: ClusterPhase, requeue: Requeue) -> Self {
        Self {
            next_phase,
            kops_status: None,
            kube_config: None,
            validated: None,
            requeue,
        }
    }
}

/// Runs one step of the provisioning state machine.
pub async fn run_phase(
    kops: &dyn KopsClientTrait,
    phase: ClusterPhase,
    manifest: &str,
    config: &KopsConfig,
) -> Result<Transition, KopsError> {
    let params = ClusterParams::new(&config.name);

    match phase {
        ClusterPhase::Pending => {
            info!("Pushing cluster manifest for {}", config.name);
            kops.replace_cluster(&config.name, manifest).await?;
            Ok(Transition::to_phase(ClusterPhase::Update, Requeue::Immediate))
        }
        ClusterPhase::Update => {
            info!("Applying cloud changes for {}", config.name);
            kops.update_cluster(&params).await?;
            let kube_config = kops.get_kube_config(&params).await?;
            kops.rolling_update_cluster(&params).await?;

            let mut transition =
                Transition::to_phase(ClusterPhase::Setup, Requeue::Immediate);
            transition.kube_config = Some(kube_config);
            Ok(transition)
        }
        ClusterPhase::Setup => {
            let result = kops.validate_cluster(&params).await?;
            settle_validation(&config.name, result, kops, &params).await
        }
        ClusterPhase::Done => Ok(Transition::to_phase(
            ClusterPhase::Done,
            Requeue::After(DONE_REQUEUE_DELAY),
        )),
    }
}

/// Maps a validation result onto the Setup/Done transition.
async fn settle_validation(
    name: &str,
    result: ValidationStatus,
    kops: &dyn KopsClientTrait,
    params: &ClusterParams,
) -> Result<Transition, KopsError> {
    if !result.failures.is_empty() {
        info!(
            "Cluster {} not yet healthy, {} validation failure(s)",
            name,
            result.failures.len()
        );
        // Failures supersede any node list from the same run.
        let mut transition =
            Transition::to_phase(ClusterPhase::Setup, Requeue::After(SETUP_RETRY_DELAY));
        transition.kops_status = Some(ValidationStatus {
            failures: result.failures,
            nodes: Vec::new(),
        });
        return Ok(transition);
    }

    if result.nodes.is_empty() {
        warn!("Cluster {} validation returned neither failures nor nodes", name);
        return Ok(Transition::to_phase(
            ClusterPhase::Setup,
            Requeue::After(SETUP_RETRY_DELAY),
        ));
    }

    info!("Cluster {} validated with {} node(s)", name, result.nodes.len());
    let kube_config = kops.get_kube_config(params).await?;

    let mut transition =
        Transition::to_phase(ClusterPhase::Done, Requeue::After(DONE_REQUEUE_DELAY));
    transition.kops_status = Some(result);
    transition.kube_config = Some(kube_config);
    transition.validated = Some(true);
    Ok(transition)
}
