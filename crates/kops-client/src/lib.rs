//! kops CLI Client
//!
//! A Rust client library for driving the kops cluster-lifecycle tool.
//! Translates cluster lifecycle intents (replace, update, rolling-update,
//! validate, delete, export-kubeconfig) into structured subprocess
//! invocations and normalizes their output into typed results.
//!
//! # Example
//!
//! ```no_run
//! use kops_client::{ClusterParams, KopsClient, KopsClientConfig, KopsClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KopsClient::new(KopsClientConfig {
//!     kops_path: "kops".to_string(),
//!     state_store: "s3://kops-state".to_string(),
//!     tmp_dir: "/tmp".into(),
//!     ssh_public_key: "kops.pub".to_string(),
//!     dev_mode: false,
//! })?;
//!
//! let params = ClusterParams::new("demo.example.com");
//! let status = client.validate_cluster(&params).await?;
//! if status.failures.is_empty() && !status.nodes.is_empty() {
//!     println!("cluster is ready");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Structured invocation**: argv lists assembled from named fields,
//!   never concatenated command strings
//! - **Streaming and capturing runners**: live log forwarding for long
//!   operations, buffered stdout where output must be decoded
//! - **Exit-code classification**: `KopsError::is_not_found` for the
//!   tool's "cluster not in state store" exit
//! - **Development mode**: canned/no-op responses for local testing
//!   without cloud credentials

pub mod client;
pub mod cmd;
pub mod envs;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod kops_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{KopsClient, KopsClientConfig};
pub use error::KopsError;
pub use kops_trait::KopsClientTrait;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockKopsClient;
