//! Error types for the podstamp controller

use thiserror::Error;

/// Top-level error type for controller startup and runtime failures.
///
/// Per-key reconciliation failures are deliberately not represented here;
/// they are converted into requeue decisions inside the control loop and
/// never terminate the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
