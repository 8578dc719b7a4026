//! Defaults resolver for `spec.kopsConfig`.
//!
//! User manifests usually set only a handful of fields; the rest come
//! from operator-level configuration and fixed fallbacks. Resolution is
//! gap-filling only: a field the user set is never overridden.

use crds::KopsConfig;

const DEFAULT_MASTER_COUNT: i32 = 1;
const DEFAULT_WORKER_COUNT: i32 = 2;
const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
const DEFAULT_ZONES: [&str; 2] = ["us-east-2a", "us-east-2b"];

/// Operator-level fallbacks applied to every cluster.
#[derive(Debug, Clone)]
pub struct ClusterDefaults {
    /// DNS zone suffix for fully-qualified cluster names
    pub dns_zone: String,
    /// kops state store URI
    pub state_store: String,
    /// VPC to place clusters in; empty lets kops create one
    pub vpc: String,
}

/// Resolves the effective kops configuration for a resource.
///
/// The cluster name and state store are always derived from operator
/// configuration; the remaining fields keep any user-supplied value and
/// fall back to fixed defaults otherwise.
pub fn resolve_kops_config(
    resource_name: &str,
    overrides: &KopsConfig,
    defaults: &ClusterDefaults,
) -> KopsConfig {
    let positive = |count: i32, fallback: i32| if count > 0 { count } else { fallback };
    let non_empty = |value: &str, fallback: &str| {
        if value.is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };

    KopsConfig {
        name: format!("{}.{}", resource_name, defaults.dns_zone),
        master_count: positive(overrides.master_count, DEFAULT_MASTER_COUNT),
        master_ec2: non_empty(&overrides.master_ec2, DEFAULT_INSTANCE_TYPE),
        worker_count: positive(overrides.worker_count, DEFAULT_WORKER_COUNT),
        worker_ec2: non_empty(&overrides.worker_ec2, DEFAULT_INSTANCE_TYPE),
        state_store: defaults.state_store.clone(),
        vpc: non_empty(&overrides.vpc, &defaults.vpc),
        zones: if overrides.zones.is_empty() {
            DEFAULT_ZONES.iter().map(ToString::to_string).collect()
        } else {
            overrides.zones.clone()
        },
    }
}
