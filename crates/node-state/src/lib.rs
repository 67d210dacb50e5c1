//! The local, in-memory `NodeState`: the only mutable shared state in the
//! system (spec §5). A single `tokio::sync::Mutex` guards the ledger and
//! job-slot map together; `schedule` additionally relies on the
//! coordinator's own admission lock to serialize calls, but holds its own
//! lock regardless so `used_memory`/`job_exists`/`done` remain safe to call
//! from outside the critical section.

mod lifecycle;

use async_trait::async_trait;
use coordinator_core::{
    Application, Cluster, Command, JobRequest, NodeState, NodeStateError,
};
use lifecycle::Ledger;
use tokio::sync::Mutex;

pub struct LocalNodeState {
    ledger: Mutex<Ledger>,
}

impl LocalNodeState {
    pub fn new() -> Self {
        Self { ledger: Mutex::new(Ledger::default()) }
    }
}

impl Default for LocalNodeState {
    fn default() -> Self {
        Self::new()
    }
}

fn map_err(job_id: &str, e: lifecycle::IllegalTransition) -> NodeStateError {
    NodeStateError::IllegalTransition { job_id: job_id.to_string(), detail: e.0.to_string() }
}

#[async_trait]
impl NodeState for LocalNodeState {
    async fn init(&self, job_id: &str) -> Result<(), NodeStateError> {
        self.ledger.lock().await.on_init(job_id).map_err(|e| map_err(job_id, e))
    }

    async fn job_exists(&self, job_id: &str) -> bool {
        self.ledger.lock().await.contains(job_id)
    }

    async fn used_memory(&self) -> u64 {
        self.ledger.lock().await.used_memory()
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
        self.ledger
            .lock()
            .await
            .on_schedule(job_id, memory_mb)
            .map_err(|e| map_err(job_id, e))
    }

    async fn done(&self, job_id: &str) -> Result<(), NodeStateError> {
        self.ledger.lock().await.on_done(job_id).map_err(|e| map_err(job_id, e))
    }
}
