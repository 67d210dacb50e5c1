//! In-memory fakes for every external collaborator, used by this crate's
//! own pipeline tests. Not exported outside `#[cfg(test)]`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{Application, Cluster, Command, ExecutionPlan, JobRecord, JobRequest, JobStatus};
use crate::ports::{
    CatalogError, CatalogStore, KillError, Killer, MetricsSink, NodeState, NodeStateError,
    Resolver, ResolutionError,
};

#[derive(Default)]
pub struct FakeCatalog {
    jobs: Mutex<HashMap<String, JobRecord>>,
    clusters: Mutex<HashMap<String, Cluster>>,
    commands: Mutex<HashMap<String, Command>>,
    applications: Mutex<HashMap<String, Application>>,
    active_counts: Mutex<HashMap<String, u64>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(self, cluster: Cluster) -> Self {
        self.clusters.lock().unwrap().insert(cluster.id.clone(), cluster);
        self
    }

    pub fn with_command(self, command: Command) -> Self {
        self.commands.lock().unwrap().insert(command.id.clone(), command);
        self
    }

    pub fn with_application(self, application: Application) -> Self {
        self.applications
            .lock()
            .unwrap()
            .insert(application.id.clone(), application);
        self
    }

    pub fn with_active_count(self, user: &str, count: u64) -> Self {
        self.active_counts.lock().unwrap().insert(user.to_string(), count);
        self
    }

    pub fn job(&self, id: &str) -> Option<JobRecord> {
        self.jobs.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl CatalogStore for FakeCatalog {
    async fn create_job(
        &self,
        _request: &JobRequest,
        _metadata: &crate::model::JobMetadata,
        record: &JobRecord,
    ) -> Result<(), CatalogError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&record.id) {
            return Err(CatalogError::Conflict(record.id.clone()));
        }
        jobs.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, CatalogError> {
        Ok(self.clusters.lock().unwrap().get(id).cloned())
    }

    async fn get_command(&self, id: &str) -> Result<Option<Command>, CatalogError> {
        Ok(self.commands.lock().unwrap().get(id).cloned())
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>, CatalogError> {
        Ok(self.applications.lock().unwrap().get(id).cloned())
    }

    async fn update_job_with_runtime_environment(
        &self,
        job_id: &str,
        _cluster_id: &str,
        _command_id: &str,
        _application_ids: &[String],
        _memory_mb: u64,
    ) -> Result<(), CatalogError> {
        if !self.jobs.lock().unwrap().contains_key(job_id) {
            return Err(CatalogError::Store(format!("unknown job {job_id}")));
        }
        Ok(())
    }

    async fn get_active_job_count_for_user(&self, user: &str) -> Result<u64, CatalogError> {
        Ok(*self.active_counts.lock().unwrap().get(user).unwrap_or(&0))
    }

    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        message: &str,
    ) -> Result<(), CatalogError> {
        let mut jobs = self.jobs.lock().unwrap();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| CatalogError::Store(format!("unknown job {job_id}")))?;
        record.status = status;
        record.status_message = message.to_string();
        Ok(())
    }
}

/// Always resolves to the same plan, or always fails, depending on how it's
/// constructed.
pub enum FakeResolver {
    Plan(ExecutionPlan),
    Fail(String),
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve(
        &self,
        _job_id: &str,
        _request: &JobRequest,
    ) -> Result<ExecutionPlan, ResolutionError> {
        match self {
            FakeResolver::Plan(plan) => Ok(plan.clone()),
            FakeResolver::Fail(msg) => Err(ResolutionError(msg.clone())),
        }
    }
}

enum Slot {
    Init,
    Admitted(u64),
}

#[derive(Default)]
pub struct FakeNodeState {
    jobs: Mutex<HashMap<String, Slot>>,
    ledger: Mutex<u64>,
    /// When set, `schedule` fails every call instead of admitting, to
    /// exercise the cleanup path on a node-state write failure.
    fail_schedule: Mutex<bool>,
}

impl FakeNodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_schedule() -> Self {
        let state = Self::default();
        *state.fail_schedule.lock().unwrap() = true;
        state
    }

    pub fn used(&self) -> u64 {
        *self.ledger.lock().unwrap()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.lock().unwrap().contains_key(job_id)
    }
}

#[async_trait]
impl NodeState for FakeNodeState {
    async fn init(&self, job_id: &str) -> Result<(), NodeStateError> {
        self.jobs.lock().unwrap().insert(job_id.to_string(), Slot::Init);
        Ok(())
    }

    async fn job_exists(&self, job_id: &str) -> bool {
        self.jobs.lock().unwrap().contains_key(job_id)
    }

    async fn used_memory(&self) -> u64 {
        *self.ledger.lock().unwrap()
    }

    async fn schedule(
        &self,
        job_id: &str,
        _request: &JobRequest,
        _cluster: &Cluster,
        _command: &Command,
        _applications: &[Application],
        memory_mb: u64,
    ) -> Result<(), NodeStateError> {
        if *self.fail_schedule.lock().unwrap() {
            return Err(NodeStateError::IllegalTransition {
                job_id: job_id.to_string(),
                detail: "simulated schedule failure".to_string(),
            });
        }
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get(job_id) {
            Some(Slot::Init) => {
                jobs.insert(job_id.to_string(), Slot::Admitted(memory_mb));
                *self.ledger.lock().unwrap() += memory_mb;
                Ok(())
            }
            Some(Slot::Admitted(_)) => Err(NodeStateError::IllegalTransition {
                job_id: job_id.to_string(),
                detail: "already admitted".to_string(),
            }),
            None => Err(NodeStateError::IllegalTransition {
                job_id: job_id.to_string(),
                detail: "no intent slot".to_string(),
            }),
        }
    }

    async fn done(&self, job_id: &str) -> Result<(), NodeStateError> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.remove(job_id) {
            Some(Slot::Admitted(memory_mb)) => {
                *self.ledger.lock().unwrap() -= memory_mb;
                Ok(())
            }
            Some(Slot::Init) => Ok(()),
            None => Err(NodeStateError::IllegalTransition {
                job_id: job_id.to_string(),
                detail: "not present".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct NoopKiller {
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Killer for NoopKiller {
    async fn kill(&self, job_id: &str, reason: &str) -> Result<(), KillError> {
        self.calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), reason.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub submit_calls: Mutex<Vec<(Duration, String, Option<String>)>>,
    pub set_job_environment_calls: Mutex<Vec<(Duration, String, Option<String>)>>,
    pub user_limit_rejections: Mutex<Vec<(String, u64)>>,
}

impl MetricsSink for RecordingMetrics {
    fn record_submit(&self, duration: Duration, outcome: &str, failure_class: Option<&str>) {
        self.submit_calls.lock().unwrap().push((
            duration,
            outcome.to_string(),
            failure_class.map(String::from),
        ));
    }

    fn record_set_job_environment(
        &self,
        duration: Duration,
        outcome: &str,
        failure_class: Option<&str>,
    ) {
        self.set_job_environment_calls.lock().unwrap().push((
            duration,
            outcome.to_string(),
            failure_class.map(String::from),
        ));
    }

    fn record_user_limit_rejected(&self, user: &str, limit: u64) {
        self.user_limit_rejections
            .lock()
            .unwrap()
            .push((user.to_string(), limit));
    }
}
