//! An in-process `CatalogStore`. Suitable for tests and for single-node
//! deployments that don't need durability across restarts.

use std::collections::HashMap;

use async_trait::async_trait;
use coordinator_core::{
    Application, CatalogError, CatalogStore, Cluster, Command, JobMetadata, JobRecord, JobRequest,
    JobStatus, RuntimeBinding,
};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    jobs: HashMap<String, JobRecord>,
    clusters: HashMap<String, Cluster>,
    commands: HashMap<String, Command>,
    applications: HashMap<String, Application>,
    runtime_bindings: HashMap<String, RuntimeBinding>,
}

/// Everything lives behind one lock: the catalog is not the contended
/// resource in this system, the node-memory ledger is, so there is no
/// reason to shard this further.
pub struct InMemoryCatalogStore {
    tables: Mutex<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self { tables: Mutex::new(Tables::default()) }
    }

    pub async fn seed_cluster(&self, cluster: Cluster) {
        self.tables.lock().await.clusters.insert(cluster.id.clone(), cluster);
    }

    pub async fn seed_command(&self, command: Command) {
        self.tables.lock().await.commands.insert(command.id.clone(), command);
    }

    pub async fn seed_application(&self, application: Application) {
        self.tables
            .lock()
            .await
            .applications
            .insert(application.id.clone(), application);
    }

    pub async fn runtime_binding(&self, job_id: &str) -> Option<RuntimeBinding> {
        self.tables.lock().await.runtime_bindings.get(job_id).cloned()
    }
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create_job(
        &self,
        _request: &JobRequest,
        _metadata: &JobMetadata,
        record: &JobRecord,
    ) -> Result<(), CatalogError> {
        let mut tables = self.tables.lock().await;
        if tables.jobs.contains_key(&record.id) {
            return Err(CatalogError::Conflict(record.id.clone()));
        }
        tables.jobs.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, CatalogError> {
        Ok(self.tables.lock().await.clusters.get(id).cloned())
    }

    async fn get_command(&self, id: &str) -> Result<Option<Command>, CatalogError> {
        Ok(self.tables.lock().await.commands.get(id).cloned())
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>, CatalogError> {
        Ok(self.tables.lock().await.applications.get(id).cloned())
    }

    async fn update_job_with_runtime_environment(
        &self,
        job_id: &str,
        cluster_id: &str,
        command_id: &str,
        application_ids: &[String],
        memory_mb: u64,
    ) -> Result<(), CatalogError> {
        let mut tables = self.tables.lock().await;
        if !tables.jobs.contains_key(job_id) {
            return Err(CatalogError::Store(format!("unknown job {job_id}")));
        }
        tables.runtime_bindings.insert(
            job_id.to_string(),
            RuntimeBinding {
                job_id: job_id.to_string(),
                cluster_id: cluster_id.to_string(),
                command_id: command_id.to_string(),
                application_ids: application_ids.to_vec(),
                memory_mb,
            },
        );
        Ok(())
    }

    async fn get_active_job_count_for_user(&self, user: &str) -> Result<u64, CatalogError> {
        let tables = self.tables.lock().await;
        let count = tables
            .jobs
            .values()
            .filter(|j| j.user == user && is_active(j.status))
            .count();
        Ok(count as u64)
    }

    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        message: &str,
    ) -> Result<(), CatalogError> {
        let mut tables = self.tables.lock().await;
        let record = tables
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| CatalogError::Store(format!("unknown job {job_id}")))?;
        record.status = status;
        record.status_message = message.to_string();
        Ok(())
    }
}

/// A job counts against the per-user quota while it is in flight: not yet
/// terminal, and not yet rejected.
fn is_active(status: JobStatus) -> bool {
    matches!(
        status,
        JobStatus::Init | JobStatus::Resolved | JobStatus::Accepted | JobStatus::Running
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn record(id: &str, user: &str, status: JobStatus) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            name: "job".to_string(),
            user: user.to_string(),
            version: "1.0".to_string(),
            tags: BTreeSet::new(),
            command_args: None,
            description: None,
            status,
            status_message: String::new(),
            archive_location: format!("/archive/{id}"),
            execution_host: "node-1".to_string(),
        }
    }

    #[tokio::test]
    async fn create_job_rejects_duplicate_ids() {
        let store = InMemoryCatalogStore::new();
        let request = JobRequest {
            id: Some("J1".to_string()),
            name: "job".to_string(),
            user: "alice".to_string(),
            version: "1.0".to_string(),
            tags: BTreeSet::new(),
            command_args: None,
            description: None,
            requested_memory_mb: None,
            criteria: Default::default(),
        };
        let metadata = JobMetadata::default();
        let rec = record("J1", "alice", JobStatus::Init);

        store.create_job(&request, &metadata, &rec).await.unwrap();
        let err = store.create_job(&request, &metadata, &rec).await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(id) if id == "J1"));
    }

    #[tokio::test]
    async fn active_count_excludes_terminal_statuses() {
        let store = InMemoryCatalogStore::new();
        let request = JobRequest {
            id: None,
            name: "job".to_string(),
            user: "alice".to_string(),
            version: "1.0".to_string(),
            tags: BTreeSet::new(),
            command_args: None,
            description: None,
            requested_memory_mb: None,
            criteria: Default::default(),
        };
        let metadata = JobMetadata::default();

        store
            .create_job(&request, &metadata, &record("J1", "alice", JobStatus::Running))
            .await
            .unwrap();
        store
            .create_job(&request, &metadata, &record("J2", "alice", JobStatus::Failed))
            .await
            .unwrap();

        assert_eq!(store.get_active_job_count_for_user("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_job_with_runtime_environment_persists_the_binding() {
        let store = InMemoryCatalogStore::new();
        let request = JobRequest {
            id: Some("J1".to_string()),
            name: "job".to_string(),
            user: "alice".to_string(),
            version: "1.0".to_string(),
            tags: BTreeSet::new(),
            command_args: None,
            description: None,
            requested_memory_mb: None,
            criteria: Default::default(),
        };
        let metadata = JobMetadata::default();
        store
            .create_job(&request, &metadata, &record("J1", "alice", JobStatus::Init))
            .await
            .unwrap();

        store
            .update_job_with_runtime_environment("J1", "C1", "K1", &["A1".to_string()], 2048)
            .await
            .unwrap();

        let binding = store.runtime_binding("J1").await.expect("binding must exist");
        assert_eq!(binding.cluster_id, "C1");
        assert_eq!(binding.command_id, "K1");
        assert_eq!(binding.application_ids, vec!["A1".to_string()]);
        assert_eq!(binding.memory_mb, 2048);
    }
}
