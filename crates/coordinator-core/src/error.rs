//! The coordinator's error taxonomy. Every failure path through the
//! admission pipeline is classified into one of these kinds; nothing above
//! stage 1 propagates a bare string or a backend-specific error type.

use thiserror::Error;

/// Typed outcome of a failed `submit`/`kill` call. Variant names track the
/// kinds in the error taxonomy, not the exception class of whatever failed
/// underneath.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The job id already exists in the Catalog Store. Nothing else was
    /// written; there is no cleanup to perform.
    #[error("job id already exists: {0}")]
    Conflict(String),

    /// The request could not be satisfied: either the resolver rejected it,
    /// or the effective memory exceeds the per-job cap. Message is preserved
    /// verbatim from the underlying cause.
    #[error("{0}")]
    Precondition(String),

    /// The submitting user is already at their active-jobs cap.
    #[error("user job limit exceeded: user={user} limit={limit}")]
    UserLimitExceeded { user: String, limit: u64 },

    /// The node does not have enough memory headroom to admit this job.
    #[error("node unavailable: {0}")]
    ServerUnavailable(String),

    /// Any unclassified failure, including a catalog invariant broken after
    /// a successful resolve.
    #[error("internal error: {0}")]
    ServerError(String),
}

/// The classification axis used for metrics tags and HTTP-like status
/// mapping. Kept distinct from the enum itself so call sites that only
/// need the tag don't have to match on payload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    Precondition,
    UserLimitExceeded,
    ServerUnavailable,
    ServerError,
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::Conflict(_) => ErrorKind::Conflict,
            CoordinatorError::Precondition(_) => ErrorKind::Precondition,
            CoordinatorError::UserLimitExceeded { .. } => ErrorKind::UserLimitExceeded,
            CoordinatorError::ServerUnavailable(_) => ErrorKind::ServerUnavailable,
            CoordinatorError::ServerError(_) => ErrorKind::ServerError,
        }
    }

    /// HTTP-like status this kind maps to. The coordinator never speaks
    /// HTTP itself; this is for a caller sitting on top of a transport.
    pub fn status_hint(&self) -> u16 {
        match self.kind() {
            ErrorKind::Conflict => 409,
            ErrorKind::Precondition => 412,
            ErrorKind::UserLimitExceeded => 429,
            ErrorKind::ServerUnavailable => 503,
            ErrorKind::ServerError => 500,
        }
    }

    /// The tag recorded on the outer timer's failure class. Stable,
    /// lowercase-free so it reads directly as a metric label value.
    pub fn class_tag(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Precondition => "Precondition",
            ErrorKind::UserLimitExceeded => "UserLimitExceeded",
            ErrorKind::ServerUnavailable => "ServerUnavailable",
            ErrorKind::ServerError => "ServerError",
        }
    }
}
