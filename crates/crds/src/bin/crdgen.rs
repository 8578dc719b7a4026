//! Prints the Cluster CRD manifest as YAML.
//!
//! Usage: `cargo run --bin crdgen > deploy/crds/cluster.yaml`

use kube::CustomResourceExt;

fn main() {
    let crd = crds::Cluster::crd();
    let yaml = serde_yaml::to_string(&crd).expect("Cluster CRD serializes to YAML");
    print!("{yaml}");
}
