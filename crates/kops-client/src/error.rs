//! kops client errors

use thiserror::Error;

/// Errors that can occur when driving the kops CLI
#[derive(Debug, Error)]
pub enum KopsError {
    /// External command returned a non-zero exit status
    #[error("kops {description} failed (exit code {code:?}): {stderr}")]
    Command {
        /// Which operation was being run (e.g. "replace cluster")
        description: String,
        /// Process exit code, if the process exited normally
        code: Option<i32>,
        /// Captured stderr tail for diagnostics
        stderr: String,
    },

    /// Filesystem or process I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON from a capturing invocation
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed YAML from an exported kubeconfig
    #[error("YAML decode error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Required cloud credentials missing at construction time
    #[error("missing required environment variables: {0}")]
    MissingEnv(String),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl KopsError {
    /// Whether this error means the named cluster is absent from the
    /// state store.
    ///
    /// kops exits with code 1 when asked about a cluster that does not
    /// exist; other failures (credentials, network, bad flags) surface
    /// with different codes or as I/O errors. Callers use this to
    /// distinguish "nothing to do" from a genuine failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, KopsError::Command { code: Some(1), .. })
    }
}
