//! A `Killer` that terminates an admitted job by releasing its `NodeState`
//! slot. The actual process-kill mechanism lives outside this crate's
//! scope (spec §1); this is the interface boundary the core talks to.

use std::sync::Arc;

use async_trait::async_trait;
use coordinator_core::{KillError, Killer, NodeState};
use tracing::info;

pub struct LocalKiller {
    node_state: Arc<dyn NodeState>,
}

impl LocalKiller {
    pub fn new(node_state: Arc<dyn NodeState>) -> Self {
        Self { node_state }
    }
}

#[async_trait]
impl Killer for LocalKiller {
    /// Idempotent: a job no longer present on this node is treated as
    /// already terminated rather than an error, the same way unregistering
    /// a connection that's already gone is a no-op rather than a failure.
    async fn kill(&self, job_id: &str, reason: &str) -> Result<(), KillError> {
        if !self.node_state.job_exists(job_id).await {
            info!(job_id, reason, "kill requested for a job not live on this node; treating as already terminated");
            return Ok(());
        }

        self.node_state
            .done(job_id)
            .await
            .map_err(|e| KillError(e.to_string()))?;
        info!(job_id, reason, "job killed");
        Ok(())
    }
}
