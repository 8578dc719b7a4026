//! Cluster Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the cluster operator.

pub mod cluster;

pub use cluster::*;
