//! The admission pipeline: `Coordinator::submit` and `Coordinator::kill`.
//!
//! This is the locus of correctness the rest of the crate exists to serve.
//! Stages are numbered in comments to match the design-level algorithm;
//! nothing here is retried — a failure at any stage is terminal for that
//! submission.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::model::{archive_location, JobMetadata, JobRecord, JobRequest, JobStatus};
use crate::ports::{
    ActiveLimitPolicy, CatalogError, CatalogStore, Killer, MetricsSink, NodeState, Resolver,
};

/// Canonical message stamped on a JobRecord when resolution fails.
/// Consumers match on this string, so it must never be reworded.
pub const RESOLVE_FAILURE_MESSAGE: &str = "failed to resolve";

/// Orchestrates the five external collaborators to implement `submit` and
/// `kill`. Cheap to clone: everything behind `Arc` except the admission
/// lock itself, which is shared via the coordinator's own `Arc` wrapper in
/// typical wiring.
pub struct Coordinator {
    config: CoordinatorConfig,
    catalog: Arc<dyn CatalogStore>,
    resolver: Arc<dyn Resolver>,
    node_state: Arc<dyn NodeState>,
    killer: Arc<dyn Killer>,
    metrics: Arc<dyn MetricsSink>,
    active_limit: Arc<dyn ActiveLimitPolicy>,
    /// The admission lock (spec §5). Guards only stage 9; never held
    /// across catalog I/O or resolver calls.
    admission_lock: tokio::sync::Mutex<()>,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoordinatorConfig,
        catalog: Arc<dyn CatalogStore>,
        resolver: Arc<dyn Resolver>,
        node_state: Arc<dyn NodeState>,
        killer: Arc<dyn Killer>,
        metrics: Arc<dyn MetricsSink>,
        active_limit: Arc<dyn ActiveLimitPolicy>,
    ) -> Self {
        Self {
            config,
            catalog,
            resolver,
            node_state,
            killer,
            metrics,
            active_limit,
            admission_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Admits or rejects a job submission. Returns the admitted job's id on
    /// success. The `coordination.timer` is recorded exactly once here,
    /// regardless of outcome (invariant 7).
    #[instrument(skip(self, request, metadata), fields(job_id))]
    pub async fn submit(
        &self,
        request: JobRequest,
        metadata: JobMetadata,
    ) -> Result<String, CoordinatorError> {
        let start = Instant::now();
        let result = self.submit_inner(request, metadata).await;

        let (outcome, failure_class) = match &result {
            Ok(_) => ("success", None),
            Err(e) => ("failure", Some(e.class_tag())),
        };
        self.metrics.record_submit(start.elapsed(), outcome, failure_class);
        result
    }

    /// Delegates to the Killer. Idempotency and liveness are its contract,
    /// not this pipeline's.
    pub async fn kill(&self, job_id: &str, reason: &str) -> Result<(), CoordinatorError> {
        self.killer
            .kill(job_id, reason)
            .await
            .map_err(|e| CoordinatorError::ServerError(e.0))
    }

    async fn submit_inner(
        &self,
        request: JobRequest,
        metadata: JobMetadata,
    ) -> Result<String, CoordinatorError> {
        // Stage 1: identity.
        let job_id = request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if job_id.is_empty() {
            return Err(CoordinatorError::ServerError(
                "failed to allocate a job id".to_string(),
            ));
        }
        tracing::Span::current().record("job_id", &job_id.as_str());

        // Stage 2: persist INIT. A uniqueness conflict here needs no
        // cleanup: nothing else has been written yet.
        let record = JobRecord {
            id: job_id.clone(),
            name: request.name.clone(),
            user: request.user.clone(),
            version: request.version.clone(),
            tags: request.tags.clone(),
            command_args: request.command_args.clone(),
            description: request.description.clone(),
            status: JobStatus::Init,
            status_message: "Job accepted and in initialization phase.".to_string(),
            archive_location: archive_location(&self.config.archive_root, &job_id),
            execution_host: self.config.hostname.clone(),
        };
        self.catalog
            .create_job(&request, &metadata, &record)
            .await
            .map_err(|e| match e {
                CatalogError::Conflict(id) => CoordinatorError::Conflict(id),
                CatalogError::Store(msg) => CoordinatorError::ServerError(msg),
            })?;

        // Stage 3: mark node-scheduled. From here on, every failure path
        // must go through `fail_and_cleanup`.
        self.node_state
            .init(&job_id)
            .await
            .map_err(|e| CoordinatorError::ServerError(e.to_string()))?;

        // Stage 4: resolve.
        let plan = match self.resolver.resolve(&job_id, &request).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(job_id = %job_id, error = %e.0, "resolution failed");
                return Err(self
                    .fail_and_cleanup(
                        &job_id,
                        JobStatus::Failed,
                        RESOLVE_FAILURE_MESSAGE.to_string(),
                        CoordinatorError::Precondition(e.0),
                    )
                    .await);
            }
        };

        // Stage 5: catalog fan-out. Anything missing here after a
        // successful resolve means the catalog is torn underneath us.
        let cluster = match self.catalog.get_cluster(&plan.cluster_id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                return Err(self
                    .torn_catalog(&job_id, "cluster", &plan.cluster_id)
                    .await)
            }
            Err(e) => return Err(self.store_error(&job_id, e).await),
        };
        let command = match self.catalog.get_command(&plan.command_id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                return Err(self
                    .torn_catalog(&job_id, "command", &plan.command_id)
                    .await)
            }
            Err(e) => return Err(self.store_error(&job_id, e).await),
        };
        let mut applications = Vec::with_capacity(plan.application_ids.len());
        for app_id in &plan.application_ids {
            match self.catalog.get_application(app_id).await {
                Ok(Some(a)) => applications.push(a),
                Ok(None) => return Err(self.torn_catalog(&job_id, "application", app_id).await),
                Err(e) => return Err(self.store_error(&job_id, e).await),
            }
        }

        // Stage 6: effective memory.
        let memory_mb = request
            .requested_memory_mb
            .or(command.default_memory_mb)
            .unwrap_or(self.config.default_job_memory_mb);
        if memory_mb > self.config.max_job_memory_mb {
            return Err(self
                .fail_and_cleanup(
                    &job_id,
                    JobStatus::Invalid,
                    format!(
                        "requested memory {memory_mb}MB exceeds the per-job maximum of {}MB",
                        self.config.max_job_memory_mb
                    ),
                    CoordinatorError::Precondition(format!(
                        "memory {memory_mb}MB exceeds maxJobMemory {}MB",
                        self.config.max_job_memory_mb
                    )),
                )
                .await);
        }

        // Stage 7: runtime binding. The timer fires regardless of outcome.
        let stage_start = Instant::now();
        let binding_result = self
            .catalog
            .update_job_with_runtime_environment(
                &job_id,
                &plan.cluster_id,
                &plan.command_id,
                &plan.application_ids,
                memory_mb,
            )
            .await;
        let (binding_outcome, binding_failure_class) = match &binding_result {
            Ok(()) => ("success", None),
            Err(_) => ("failure", Some("ServerError")),
        };
        self.metrics.record_set_job_environment(
            stage_start.elapsed(),
            binding_outcome,
            binding_failure_class,
        );
        if let Err(e) = binding_result {
            let msg = e.to_string();
            return Err(self
                .fail_and_cleanup(&job_id, JobStatus::Failed, msg.clone(), CoordinatorError::ServerError(msg))
                .await);
        }

        // Stage 8: user quota.
        if self.config.active_limit_enabled {
            let limit = self.active_limit.limit_for(&request.user);
            let active = self
                .catalog
                .get_active_job_count_for_user(&request.user)
                .await
                .map_err(|e| e.to_string());
            let active = match active {
                Ok(n) => n,
                Err(msg) => {
                    return Err(self
                        .fail_and_cleanup(&job_id, JobStatus::Failed, msg.clone(), CoordinatorError::ServerError(msg))
                        .await)
                }
            };
            if active >= limit {
                self.metrics.record_user_limit_rejected(&request.user, limit);
                let message = format!(
                    "user job limit exceeded: user={} limit={}",
                    request.user, limit
                );
                return Err(self
                    .fail_and_cleanup(
                        &job_id,
                        JobStatus::Failed,
                        message.clone(),
                        CoordinatorError::UserLimitExceeded {
                            user: request.user.clone(),
                            limit,
                        },
                    )
                    .await);
            }
        }

        // Stage 9: node memory admission, the critical section. No remote
        // I/O may happen while the admission lock is held, so the outcome is
        // captured here and any cleanup runs after the lock is released.
        let admission = {
            let _guard = self.admission_lock.lock().await;
            let used = self.node_state.used_memory().await;
            if used + memory_mb <= self.config.max_system_memory_mb {
                Some(
                    self.node_state
                        .schedule(&job_id, &request, &cluster, &command, &applications, memory_mb)
                        .await,
                )
            } else {
                None
            }
        };

        match admission {
            Some(Ok(())) => {
                info!(job_id = %job_id, memory_mb, "job admitted");
                Ok(job_id)
            }
            Some(Err(e)) => {
                let msg = e.to_string();
                Err(self
                    .fail_and_cleanup(&job_id, JobStatus::Failed, msg.clone(), CoordinatorError::ServerError(msg))
                    .await)
            }
            None => Err(self
                .fail_and_cleanup(
                    &job_id,
                    JobStatus::Failed,
                    "node memory exhausted".to_string(),
                    CoordinatorError::ServerUnavailable(
                        "insufficient memory headroom on this node".to_string(),
                    ),
                )
                .await),
        }
    }

    async fn torn_catalog(&self, job_id: &str, kind: &str, id: &str) -> CoordinatorError {
        let message = format!("{kind} {id} referenced by execution plan not found in catalog");
        self.fail_and_cleanup(
            job_id,
            JobStatus::Failed,
            message.clone(),
            CoordinatorError::ServerError(message),
        )
        .await
    }

    async fn store_error(&self, job_id: &str, e: CatalogError) -> CoordinatorError {
        let message = e.to_string();
        self.fail_and_cleanup(
            job_id,
            JobStatus::Failed,
            message.clone(),
            CoordinatorError::ServerError(message),
        )
        .await
    }

    /// The universal cleanup routine (spec §7): if Node State still has an
    /// intent or admitted slot for this job, release it and mark the
    /// record with `pending_status`. Returns `error` unchanged so call
    /// sites can `return Err(self.fail_and_cleanup(...).await)`.
    async fn fail_and_cleanup(
        &self,
        job_id: &str,
        pending_status: JobStatus,
        message: String,
        error: CoordinatorError,
    ) -> CoordinatorError {
        if self.node_state.job_exists(job_id).await {
            if let Err(e) = self.node_state.done(job_id).await {
                warn!(job_id, error = %e, "done() failed during cleanup");
            }
            if let Err(e) = self
                .catalog
                .update_job_status(job_id, pending_status, &message)
                .await
            {
                warn!(job_id, error = %e, "status update failed during cleanup");
            }
        }
        error
    }
}
