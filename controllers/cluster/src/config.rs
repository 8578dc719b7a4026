//! Operator configuration
//!
//! All ambient configuration is read once at startup into an explicit
//! struct and threaded into every component constructor; nothing reads
//! the environment after this point.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ControllerError;

/// Operator-level configuration, sourced from environment variables.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Path to the kops binary (`KOPS_PATH`, default `kops`)
    pub kops_path: String,
    /// kops state store URI (`KOPS_STATE_STORE`, required)
    pub state_store: String,
    /// DNS zone suffix appended to resource names (`KOPS_CLUSTER_DNS_ZONE`, required)
    pub dns_zone: String,
    /// SSH public key path (`KOPS_SSH_KEY`, default `kops.pub`)
    pub ssh_public_key: String,
    /// Scratch directory for manifest/kubeconfig files (`TMP_DIR`, default `/tmp`)
    pub tmp_dir: PathBuf,
    /// Default VPC for clusters without an override (`KOPS_VPC`, optional)
    pub vpc: String,
    /// Development mode (`CLUSTER_OPERATOR_DEVELOPMENT`, default false)
    pub dev_mode: bool,
    /// Namespace to watch (`WATCH_NAMESPACE`, optional)
    pub namespace: Option<String>,
    /// Bind address for the admission endpoint (`ADMISSION_BIND`, optional;
    /// unset disables the admission server)
    pub admission_bind: Option<SocketAddr>,
}

impl OperatorConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ControllerError> {
        let state_store = std::env::var("KOPS_STATE_STORE").map_err(|_| {
            ControllerError::InvalidConfig(
                "KOPS_STATE_STORE environment variable is required".to_string(),
            )
        })?;
        let dns_zone = std::env::var("KOPS_CLUSTER_DNS_ZONE").map_err(|_| {
            ControllerError::InvalidConfig(
                "KOPS_CLUSTER_DNS_ZONE environment variable is required".to_string(),
            )
        })?;

        let admission_bind = match std::env::var("ADMISSION_BIND") {
            Ok(raw) => Some(parse_bind_addr(&raw)?),
            Err(_) => None,
        };

        Ok(Self {
            kops_path: std::env::var("KOPS_PATH").unwrap_or_else(|_| "kops".to_string()),
            state_store,
            dns_zone,
            ssh_public_key: std::env::var("KOPS_SSH_KEY")
                .unwrap_or_else(|_| "kops.pub".to_string()),
            tmp_dir: std::env::var("TMP_DIR")
                .unwrap_or_else(|_| "/tmp".to_string())
                .into(),
            vpc: std::env::var("KOPS_VPC").unwrap_or_default(),
            dev_mode: std::env::var("CLUSTER_OPERATOR_DEVELOPMENT")
                .map(|raw| parse_bool(&raw))
                .unwrap_or(false),
            namespace: std::env::var("WATCH_NAMESPACE").ok(),
            admission_bind,
        })
    }
}

/// Parses a boolean environment value; anything but an affirmative
/// spelling is false.
fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_bind_addr(raw: &str) -> Result<SocketAddr, ControllerError> {
    raw.parse().map_err(|_| {
        ControllerError::InvalidConfig(format!("ADMISSION_BIND is not a socket address: {raw}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_affirmative_spellings() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" yes "));
        assert!(parse_bool("on"));
    }

    #[test]
    fn parse_bool_rejects_everything_else() {
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("enabled"));
    }

    #[test]
    fn parse_bind_addr_accepts_socket_addresses() {
        let addr = parse_bind_addr("0.0.0.0:8443").unwrap();
        assert_eq!(addr.port(), 8443);
    }

    #[test]
    fn parse_bind_addr_rejects_bare_ports() {
        assert!(parse_bind_addr("8443").is_err());
        assert!(parse_bind_addr("not-an-addr").is_err());
    }
}
