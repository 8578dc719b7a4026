//! Cluster Controller
//!
//! Operator for provisioning Kubernetes clusters on AWS by driving the
//! kops cluster-lifecycle tool:
//! - watches the Cluster CRD for desired-state changes
//! - walks each resource through Pending -> Update -> Setup -> Done
//! - tears down the external cluster via a finalizer before the
//!   resource is removed from the store

mod admission;
mod backoff;
mod config;
mod controller;
mod error;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Cluster Controller");

    let config = OperatorConfig::from_env()?;
    info!("Configuration:");
    info!("  kops binary: {}", config.kops_path);
    info!("  State store: {}", config.state_store);
    info!("  DNS zone: {}", config.dns_zone);
    info!("  Development mode: {}", config.dev_mode);
    info!(
        "  Namespace: {}",
        config.namespace.as_deref().unwrap_or("default")
    );

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
