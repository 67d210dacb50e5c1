//! SQLite-backed `CatalogStore`. WAL mode for concurrent readers while the
//! coordinator's writers (one per submission) proceed independently of the
//! admission lock, which never guards catalog I/O.

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use coordinator_core::{
    Application, CatalogError, CatalogStore, Cluster, Command, JobMetadata, JobRecord, JobRequest,
    JobStatus,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteJournalMode};
use sqlx::{migrate::MigrateDatabase, Row};

pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    /// Open or create a SQLite database at `path`, running migrations to
    /// bring the schema up to date.
    pub async fn open(path: &str) -> anyhow::Result<Self> {
        let db_url = if path.starts_with("sqlite://") {
            path.to_string()
        } else {
            format!("sqlite://{path}")
        };

        if !sqlx::Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            sqlx::Sqlite::create_database(&db_url).await?;
        }

        let options = SqliteConnectOptions::from_str(&db_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn status_to_str(status: JobStatus) -> &'static str {
    status.as_str()
}

fn status_from_str(s: &str) -> Result<JobStatus, CatalogError> {
    match s {
        "INIT" => Ok(JobStatus::Init),
        "RESOLVED" => Ok(JobStatus::Resolved),
        "ACCEPTED" => Ok(JobStatus::Accepted),
        "INVALID" => Ok(JobStatus::Invalid),
        "FAILED" => Ok(JobStatus::Failed),
        "KILLED" => Ok(JobStatus::Killed),
        "SUCCEEDED" => Ok(JobStatus::Succeeded),
        "RUNNING" => Ok(JobStatus::Running),
        other => Err(CatalogError::Store(format!("unknown job status {other}"))),
    }
}

/// A job counts against the per-user quota while it is in flight.
fn is_active(status: JobStatus) -> bool {
    matches!(
        status,
        JobStatus::Init | JobStatus::Resolved | JobStatus::Accepted | JobStatus::Running
    )
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn create_job(
        &self,
        _request: &JobRequest,
        metadata: &JobMetadata,
        record: &JobRecord,
    ) -> Result<(), CatalogError> {
        let tags = serde_json::to_string(&record.tags)
            .map_err(|e| CatalogError::Store(e.to_string()))?;
        let command_args = record
            .command_args
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| CatalogError::Store(e.to_string()))?;
        let labels =
            serde_json::to_string(&metadata.labels).map_err(|e| CatalogError::Store(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO jobs (id, name, user, version, tags, command_args, description, status, status_message, archive_location, execution_host, client_host, user_agent, labels)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.user)
        .bind(&record.version)
        .bind(tags)
        .bind(command_args)
        .bind(&record.description)
        .bind(status_to_str(record.status))
        .bind(&record.status_message)
        .bind(&record.archive_location)
        .bind(&record.execution_host)
        .bind(&metadata.client_host)
        .bind(&metadata.user_agent)
        .bind(labels)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(CatalogError::Conflict(record.id.clone()))
            }
            Err(e) => Err(CatalogError::Store(e.to_string())),
        }
    }

    async fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, CatalogError> {
        let row = sqlx::query("SELECT id FROM clusters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CatalogError::Store(e.to_string()))?;
        Ok(row.map(|r| Cluster { id: r.get("id") }))
    }

    async fn get_command(&self, id: &str) -> Result<Option<Command>, CatalogError> {
        let row = sqlx::query("SELECT id, default_memory_mb FROM commands WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CatalogError::Store(e.to_string()))?;
        Ok(row.map(|r| Command {
            id: r.get("id"),
            default_memory_mb: r.get::<Option<i64>, _>("default_memory_mb").map(|v| v as u64),
        }))
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>, CatalogError> {
        let row = sqlx::query("SELECT id FROM applications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CatalogError::Store(e.to_string()))?;
        Ok(row.map(|r| Application { id: r.get("id") }))
    }

    async fn update_job_with_runtime_environment(
        &self,
        job_id: &str,
        cluster_id: &str,
        command_id: &str,
        application_ids: &[String],
        memory_mb: u64,
    ) -> Result<(), CatalogError> {
        let application_ids_json =
            serde_json::to_string(application_ids).map_err(|e| CatalogError::Store(e.to_string()))?;

        sqlx::query(
            "INSERT INTO runtime_bindings (job_id, cluster_id, command_id, application_ids, memory_mb)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (job_id) DO UPDATE SET
                cluster_id = excluded.cluster_id,
                command_id = excluded.command_id,
                application_ids = excluded.application_ids,
                memory_mb = excluded.memory_mb",
        )
        .bind(job_id)
        .bind(cluster_id)
        .bind(command_id)
        .bind(application_ids_json)
        .bind(memory_mb as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get_active_job_count_for_user(&self, user: &str) -> Result<u64, CatalogError> {
        let rows = sqlx::query("SELECT status FROM jobs WHERE user = ?")
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CatalogError::Store(e.to_string()))?;

        let mut count = 0u64;
        for row in rows {
            let status: String = row.get("status");
            if is_active(status_from_str(&status)?) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        message: &str,
    ) -> Result<(), CatalogError> {
        let result = sqlx::query("UPDATE jobs SET status = ?, status_message = ? WHERE id = ?")
            .bind(status_to_str(status))
            .bind(message)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::Store(format!("unknown job {job_id}")));
        }
        Ok(())
    }
}
