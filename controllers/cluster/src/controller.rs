//! Main controller implementation.
//!
//! Wires the operator configuration into the kops client, reconciler
//! and watcher, and runs the watcher (plus the optional admission
//! endpoint) as background tasks.

use crate::admission;
use crate::config::OperatorConfig;
use crate::error::ControllerError;
use crate::reconciler::defaults::ClusterDefaults;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crds::Cluster;
use kops_client::{KopsClient, KopsClientConfig};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Main controller for Cluster resource management.
pub struct Controller {
    cluster_watcher: JoinHandle<Result<(), ControllerError>>,
    admission_server: Option<JoinHandle<Result<(), ControllerError>>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: OperatorConfig) -> Result<Self, ControllerError> {
        info!("Initializing Cluster Controller");

        let kube_client = Client::try_default().await?;

        // Constructing the client validates cloud credentials up front.
        let kops_client = KopsClient::new(KopsClientConfig {
            kops_path: config.kops_path.clone(),
            state_store: config.state_store.clone(),
            tmp_dir: config.tmp_dir.clone(),
            ssh_public_key: config.ssh_public_key.clone(),
            dev_mode: config.dev_mode,
        })?;

        if config.dev_mode {
            warn!("Development mode: cloud-touching kops verbs are stubbed");
        }

        let ns = config.namespace.as_deref().unwrap_or("default");
        let cluster_api: Api<Cluster> = Api::namespaced(kube_client, ns);

        let defaults = ClusterDefaults {
            dns_zone: config.dns_zone.clone(),
            state_store: config.state_store.clone(),
            vpc: config.vpc.clone(),
        };

        let reconciler = Arc::new(Reconciler::new(kops_client, cluster_api.clone(), defaults));

        let watcher = Watcher::new(reconciler.clone(), cluster_api);
        let cluster_watcher = tokio::spawn(async move { watcher.watch_clusters().await });

        let admission_server = config.admission_bind.map(|bind| {
            tokio::spawn(async move { admission::serve(bind).await })
        });

        Ok(Self {
            cluster_watcher,
            admission_server,
        })
    }

    /// Runs until a background task exits.
    ///
    /// The watcher runs indefinitely in normal operation, so returning
    /// at all means the process should terminate and let the pod
    /// restart.
    pub async fn run(self) -> Result<(), ControllerError> {
        match self.admission_server {
            Some(admission) => {
                tokio::select! {
                    watch = self.cluster_watcher => Self::flatten(watch, "Cluster watcher"),
                    serve = admission => Self::flatten(serve, "Admission server"),
                }
            }
            None => Self::flatten(self.cluster_watcher.await, "Cluster watcher"),
        }
    }

    fn flatten(
        joined: Result<Result<(), ControllerError>, tokio::task::JoinError>,
        task: &str,
    ) -> Result<(), ControllerError> {
        match joined {
            Ok(result) => result,
            Err(e) => Err(ControllerError::Watch(format!("{task} task panicked: {e}"))),
        }
    }
}
