//! Kubernetes resource watchers.
//!
//! Watches Cluster resources and drives reconciliation through
//! `kube_runtime::Controller`, which handles reconnection and event
//! retries; failed reconciles requeue with the per-resource Fibonacci
//! backoff and the backoff resets once a reconcile succeeds.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::Cluster;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Generic watcher helper around `kube_runtime::Controller`.
///
/// The reconcile closure wraps the reconciler's per-resource method; the
/// error policy charges the resource's backoff sequence so repeated
/// failures against the external tool space out instead of hot-looping.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &str,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Action, ControllerError>> + Send>> + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = format!(
            "{}/{}",
            obj.namespace().unwrap_or_else(|| "default".to_string()),
            obj.name_any()
        );
        ctx.increment_error(&key);
        let (delay, errors) = ctx.get_backoff_for_resource(&key);
        error!(
            "Reconciliation error for {}: {} (error #{}, retry in {}s)",
            key, error, errors, delay
        );
        Action::requeue(Duration::from_secs(delay))
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        let resource_name = resource_name.to_string();
        async move {
            debug!("Reconciling {} {:?}", resource_name, obj.meta().name);
            reconcile_fn(ctx, obj).await
        }
    };

    // Debounce batches bursts of status updates; kops operations are
    // slow enough that one reconcile at a time per resource suffices.
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for {}: {}", resource_name, e);
            }
        })
        .await;

    Ok(())
}

/// Watches Cluster resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    cluster_api: Api<Cluster>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, cluster_api: Api<Cluster>) -> Self {
        Self {
            reconciler,
            cluster_api,
        }
    }

    /// Starts watching Cluster resources.
    pub async fn watch_clusters(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.cluster_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_cluster(&resource).await })
            },
            "Cluster",
        )
        .await
    }
}
