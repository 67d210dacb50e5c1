//! Trait boundaries for the coordinator's external collaborators. The core
//! depends only on these; concrete backends live in sibling crates.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Application, Cluster, Command, JobMetadata, JobRecord, JobRequest, JobStatus};

/// Generic store failure. The core does not attempt to distinguish a
/// connection drop from a constraint violation beyond the explicit
/// `Conflict` case each operation surfaces directly.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("job id already exists: {0}")]
    Conflict(String),
    #[error("catalog store error: {0}")]
    Store(String),
}

/// Durable storage of applications, commands, clusters and jobs. All
/// operations are expected synchronous from the store's point of view;
/// here they're async so a real backend can do network or disk I/O without
/// blocking the coordinator's worker.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_job(
        &self,
        request: &JobRequest,
        metadata: &JobMetadata,
        record: &JobRecord,
    ) -> Result<(), CatalogError>;

    async fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, CatalogError>;
    async fn get_command(&self, id: &str) -> Result<Option<Command>, CatalogError>;
    async fn get_application(&self, id: &str) -> Result<Option<Application>, CatalogError>;

    async fn update_job_with_runtime_environment(
        &self,
        job_id: &str,
        cluster_id: &str,
        command_id: &str,
        application_ids: &[String],
        memory_mb: u64,
    ) -> Result<(), CatalogError>;

    async fn get_active_job_count_for_user(&self, user: &str) -> Result<u64, CatalogError>;

    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        message: &str,
    ) -> Result<(), CatalogError>;
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ResolutionError(pub String);

/// Turns a request's abstract criteria into a concrete execution plan. The
/// core never interprets a resolution failure; it remaps it uniformly to a
/// `Precondition`.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        job_id: &str,
        request: &JobRequest,
    ) -> Result<crate::model::ExecutionPlan, ResolutionError>;
}

#[derive(Debug, Error)]
pub enum NodeStateError {
    #[error("illegal node state transition for job {job_id}: {detail}")]
    IllegalTransition { job_id: String, detail: String },
}

/// The per-node ledger and job lifecycle (`absent -> init -> admitted ->
/// done`). `schedule` is the only operation that may be called from inside
/// the admission lock; every other method may be called freely.
#[async_trait]
pub trait NodeState: Send + Sync {
    /// Record an intent slot for `job_id` with zero memory so the error
    /// path can later call `done` even if `schedule` never runs.
    async fn init(&self, job_id: &str) -> Result<(), NodeStateError>;

    /// Membership test. Used purely by the error-cleanup path to decide
    /// whether `done` is applicable.
    async fn job_exists(&self, job_id: &str) -> bool;

    /// Current sum of memory reserved by admitted jobs.
    async fn used_memory(&self) -> u64;

    /// Atomically add `memory_mb` to the ledger and mark the job admitted.
    /// Callers must hold the coordinator's admission lock; this method
    /// performs no internal exclusion against other `schedule` calls.
    #[allow(clippy::too_many_arguments)]
    async fn schedule(
        &self,
        job_id: &str,
        request: &JobRequest,
        cluster: &Cluster,
        command: &Command,
        applications: &[Application],
        memory_mb: u64,
    ) -> Result<(), NodeStateError>;

    /// Remove the job and subtract its committed memory (0 for an
    /// intent-only slot, `memory_mb` for an admitted one).
    async fn done(&self, job_id: &str) -> Result<(), NodeStateError>;
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct KillError(pub String);

/// Terminates an admitted job. Idempotency and liveness are this
/// component's contract, not the coordinator's.
#[async_trait]
pub trait Killer: Send + Sync {
    async fn kill(&self, job_id: &str, reason: &str) -> Result<(), KillError>;
}

/// Per-user active-jobs cap. Kept as its own trait so the root crate can
/// drive it from configuration without `coordinator-core` knowing about
/// config file shapes.
pub trait ActiveLimitPolicy: Send + Sync {
    fn limit_for(&self, user: &str) -> u64;
}

/// A fixed cap applied to every user. Used by tests and by deployments that
/// don't need per-user overrides.
pub struct FixedLimitPolicy(pub u64);

impl ActiveLimitPolicy for FixedLimitPolicy {
    fn limit_for(&self, _user: &str) -> u64 {
        self.0
    }
}

/// Counters and timers keyed by tag sets. Implementations are synchronous:
/// recording a metric must never itself be a suspension point.
pub trait MetricsSink: Send + Sync {
    /// `coordination.timer`. Recorded exactly once per `submit` call.
    fn record_submit(&self, duration: std::time::Duration, outcome: &str, failure_class: Option<&str>);

    /// `submit.setJobEnvironment.timer`. Recorded once per stage 7
    /// attempt, regardless of its outcome.
    fn record_set_job_environment(
        &self,
        duration: std::time::Duration,
        outcome: &str,
        failure_class: Option<&str>,
    );

    /// `submit.rejected.jobs-limit.counter`. Incremented exactly once per
    /// `UserLimitExceeded` outcome.
    fn record_user_limit_rejected(&self, user: &str, limit: u64);
}
