//! kops CLI client
//!
//! Builds structured argv lists per verb and runs them through the
//! streaming or capturing runner. Commands follow the shape
//! `kops <verb> cluster --state=<store> --name=<name> [flags] --yes`,
//! except `replace` which takes a manifest file instead of a name.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cmd::{run_capturing, run_streaming};
use crate::envs;
use crate::error::KopsError;
use crate::kops_trait::KopsClientTrait;
use crate::models::{ClusterParams, KubeConfig, ValidationNode, ValidationStatus};

/// Configuration for constructing a [`KopsClient`].
#[derive(Debug, Clone)]
pub struct KopsClientConfig {
    /// Path to the kops binary
    pub kops_path: String,
    /// State store URI (e.g. `s3://kops-state`)
    pub state_store: String,
    /// Scratch directory for manifest and kubeconfig files
    pub tmp_dir: PathBuf,
    /// SSH public key material registered with provisioned clusters
    pub ssh_public_key: String,
    /// Substitute canned/no-op responses for cloud-touching verbs
    pub dev_mode: bool,
}

/// Client for the kops CLI.
#[derive(Debug)]
pub struct KopsClient {
    config: KopsClientConfig,
}

impl KopsClient {
    /// Creates a new client.
    ///
    /// Outside development mode this fails when AWS credentials are
    /// absent from the environment or the state store is unset, so
    /// misconfiguration surfaces at startup.
    pub fn new(config: KopsClientConfig) -> Result<Self, KopsError> {
        if !config.dev_mode {
            envs::check_cloud_envs()?;
        }
        if config.state_store.is_empty() {
            return Err(KopsError::InvalidConfig(
                "kops state store must not be empty".to_string(),
            ));
        }
        Ok(Self { config })
    }

    fn state_flag(&self) -> String {
        format!("--state={}", self.config.state_store)
    }

    /// Scratch path for a cluster's manifest file.
    fn manifest_path(&self, name: &str) -> PathBuf {
        self.config.tmp_dir.join(format!("{name}.yaml"))
    }

    /// Scratch path for a cluster's exported kubeconfig.
    fn kubeconfig_path(&self, name: &str) -> PathBuf {
        self.config.tmp_dir.join(format!("config-{name}"))
    }

    fn replace_args(&self, manifest: &Path) -> Vec<String> {
        vec![
            "replace".to_string(),
            "cluster".to_string(),
            "-f".to_string(),
            manifest.to_string_lossy().into_owned(),
            self.state_flag(),
            "--force".to_string(),
        ]
    }

    fn update_args(&self, name: &str) -> Vec<String> {
        vec![
            "update".to_string(),
            "cluster".to_string(),
            self.state_flag(),
            format!("--name={name}"),
            "--yes".to_string(),
        ]
    }

    fn rolling_update_args(&self, name: &str) -> Vec<String> {
        vec![
            "rolling-update".to_string(),
            "cluster".to_string(),
            self.state_flag(),
            format!("--name={name}"),
            "--fail-on-validate-error=false".to_string(),
            "--yes".to_string(),
        ]
    }

    fn validate_args(&self, name: &str) -> Vec<String> {
        vec![
            "validate".to_string(),
            "cluster".to_string(),
            self.state_flag(),
            format!("--name={name}"),
            "-o".to_string(),
            "json".to_string(),
        ]
    }

    fn export_kubecfg_args(&self, name: &str) -> Vec<String> {
        vec![
            "export".to_string(),
            "kubecfg".to_string(),
            format!("--name={name}"),
            self.state_flag(),
            format!("--kubeconfig={}", self.kubeconfig_path(name).to_string_lossy()),
        ]
    }

    fn delete_args(&self, name: &str) -> Vec<String> {
        vec![
            "delete".to_string(),
            "cluster".to_string(),
            format!("--name={name}"),
            self.state_flag(),
            "--yes".to_string(),
        ]
    }

    fn get_args(&self, name: Option<&str>) -> Vec<String> {
        let mut args = vec!["get".to_string(), "cluster".to_string(), self.state_flag()];
        if let Some(name) = name {
            args.push(format!("--name={name}"));
        }
        args
    }

    /// Canned ready status returned by development-mode validation.
    fn dev_mode_status() -> ValidationStatus {
        ValidationStatus {
            failures: Vec::new(),
            nodes: vec![ValidationNode {
                name: "ip-172-17-17-143.compute.internal".to_string(),
                zone: "us-east-2a".to_string(),
                role: "Master".to_string(),
                hostname: "ip-172-17-17-143.compute.internal".to_string(),
                status: "True".to_string(),
            }],
        }
    }
}

#[async_trait::async_trait]
impl KopsClientTrait for KopsClient {
    async fn replace_cluster(&self, name: &str, manifest: &str) -> Result<(), KopsError> {
        let path = self.manifest_path(name);
        tokio::fs::write(&path, manifest).await?;
        run_streaming(
            "replace cluster",
            &self.config.kops_path,
            &self.replace_args(&path),
        )
        .await
    }

    async fn update_cluster(&self, params: &ClusterParams) -> Result<(), KopsError> {
        if self.config.dev_mode {
            debug!("Development mode: skipping update of {}", params.name);
            return Ok(());
        }
        run_streaming(
            "update cluster",
            &self.config.kops_path,
            &self.update_args(&params.name),
        )
        .await
    }

    async fn rolling_update_cluster(&self, params: &ClusterParams) -> Result<(), KopsError> {
        if self.config.dev_mode {
            debug!("Development mode: skipping rolling update of {}", params.name);
            return Ok(());
        }

        // rolling-update reads the local kubeconfig; make sure it exists
        self.get_kube_config(params).await?;

        run_streaming(
            "rolling-update cluster",
            &self.config.kops_path,
            &self.rolling_update_args(&params.name),
        )
        .await
    }

    async fn validate_cluster(&self, params: &ClusterParams) -> Result<ValidationStatus, KopsError> {
        if self.config.dev_mode {
            debug!("Development mode: reporting {} as ready", params.name);
            return Ok(Self::dev_mode_status());
        }

        self.get_kube_config(params).await?;

        let out = run_capturing(
            "validate cluster",
            &self.config.kops_path,
            &self.validate_args(&params.name),
        )
        .await?;

        // Decode strictly before any field is consulted; malformed
        // output is an error, never a zero-valued status.
        let status: ValidationStatus = serde_json::from_slice(&out)?;
        Ok(status)
    }

    async fn get_kube_config(&self, params: &ClusterParams) -> Result<KubeConfig, KopsError> {
        if self.config.dev_mode {
            return Ok(KubeConfig::default());
        }

        run_streaming(
            "export kubecfg",
            &self.config.kops_path,
            &self.export_kubecfg_args(&params.name),
        )
        .await?;

        let path = self.kubeconfig_path(&params.name);
        let raw = tokio::fs::read(&path).await?;
        let config: KubeConfig = serde_yaml::from_slice(&raw)?;
        Ok(config)
    }

    async fn delete_cluster(&self, params: &ClusterParams) -> Result<(), KopsError> {
        info!("Deleting cluster {}", params.name);
        run_streaming(
            "delete cluster",
            &self.config.kops_path,
            &self.delete_args(&params.name),
        )
        .await
    }

    async fn get_cluster(&self, params: &ClusterParams) -> Result<bool, KopsError> {
        let result = run_capturing(
            "get cluster",
            &self.config.kops_path,
            &self.get_args(Some(&params.name)),
        )
        .await;
        match result {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn list_clusters(&self) -> Result<Vec<String>, KopsError> {
        let mut args = self.get_args(None);
        args.push("-o".to_string());
        args.push("json".to_string());

        let out = run_capturing("get clusters", &self.config.kops_path, &args).await?;
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        Ok(cluster_names(&value))
    }
}

/// Extracts `metadata.name` from `kops get cluster -o json` output.
///
/// kops prints a bare object for a single cluster and an array for
/// several; both shapes are accepted.
fn cluster_names(value: &serde_json::Value) -> Vec<String> {
    let manifests: Vec<&serde_json::Value> = match value {
        serde_json::Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    manifests
        .iter()
        .filter_map(|m| m["metadata"]["name"].as_str().map(str::to_string))
        .collect()
}
