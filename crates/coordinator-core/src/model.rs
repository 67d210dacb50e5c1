//! Data model shared by the admission pipeline and its collaborators.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// A job submission as it arrives at the coordinator. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    /// Client-supplied id. If present it must be unique across every job the
    /// Catalog Store has ever seen; the store's uniqueness check is the
    /// arbiter, not this type.
    pub id: Option<String>,
    pub name: String,
    pub user: String,
    pub version: String,
    pub tags: BTreeSet<String>,
    pub command_args: Option<Vec<String>>,
    pub description: Option<String>,
    pub requested_memory_mb: Option<u64>,
    /// Resource-selection criteria. Opaque to the core; only the Resolver
    /// interprets these.
    pub criteria: HashMap<String, String>,
}

/// Sidecar submission context. Opaque to the core beyond being persisted
/// verbatim alongside the job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobMetadata {
    pub client_host: Option<String>,
    pub user_agent: Option<String>,
    pub labels: HashMap<String, String>,
}

/// Lifecycle status of a job record. Only `Init`, `Invalid` and `Failed` are
/// ever written by the coordinator; the rest are set by downstream lifecycle
/// events outside this crate's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Init,
    Resolved,
    Accepted,
    Invalid,
    Failed,
    Killed,
    Succeeded,
    Running,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Init => "INIT",
            JobStatus::Resolved => "RESOLVED",
            JobStatus::Accepted => "ACCEPTED",
            JobStatus::Invalid => "INVALID",
            JobStatus::Failed => "FAILED",
            JobStatus::Killed => "KILLED",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Running => "RUNNING",
        }
    }
}

/// Persisted job row. Owned by the Catalog Store; the coordinator only ever
/// writes it in the stages described in the admission pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: String,
    pub name: String,
    pub user: String,
    pub version: String,
    pub tags: BTreeSet<String>,
    pub command_args: Option<Vec<String>>,
    pub description: Option<String>,
    pub status: JobStatus,
    pub status_message: String,
    pub archive_location: String,
    pub execution_host: String,
}

/// The resolved tuple describing how a job will be run. Produced by the
/// Resolver and never mutated after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub cluster_id: String,
    pub command_id: String,
    pub application_ids: Vec<String>,
}

/// The persisted association between a job and its resolved plan plus
/// memory reservation. Write-once per job id on the happy path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeBinding {
    pub job_id: String,
    pub cluster_id: String,
    pub command_id: String,
    pub application_ids: Vec<String>,
    pub memory_mb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: String,
    pub default_memory_mb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: String,
}

/// Derive the per-job archive path: `archive_root` normalized to end with a
/// path separator, followed by the job id, stored and compared verbatim.
pub fn archive_location(archive_root: &str, job_id: &str) -> String {
    let mut root = archive_root.to_string();
    if !root.ends_with('/') {
        root.push('/');
    }
    format!("{root}{job_id}")
}
