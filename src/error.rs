//! Error types for the coordinator CLI harness.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur wiring up or driving the coordinator from the
/// command line. A `CoordinatorError` from the pipeline itself is wrapped
/// verbatim so its `status_hint()`/`kind()` classification survives to the
/// point where the CLI renders it.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read request file: {0}")]
    RequestFile(String),

    #[error(transparent)]
    Coordinator(#[from] coordinator_core::CoordinatorError),

    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// HTTP-like status a transport sitting on top of this CLI would
    /// report. Config/IO errors are always server errors from the
    /// caller's point of view.
    pub fn status_hint(&self) -> u16 {
        match self {
            CliError::Coordinator(e) => e.status_hint(),
            _ => 500,
        }
    }
}
