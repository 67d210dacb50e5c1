//! Pipeline-level configuration. The root crate's `CoordinatorSettings`
//! loads these values from a TOML file; this type is what the pipeline
//! actually consumes.

/// Options recognized by the admission pipeline (spec §6). Intentionally
/// plain data: loading and defaulting is the root crate's job.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Root for per-job archive paths. Normalized to end with `/` by
    /// [`crate::model::archive_location`], not by this struct.
    pub archive_root: String,
    /// Fallback memory when neither the request nor the command specifies
    /// one.
    pub default_job_memory_mb: u64,
    /// Hard upper bound per job; exceeding it yields `INVALID`.
    pub max_job_memory_mb: u64,
    /// This node's ledger cap.
    pub max_system_memory_mb: u64,
    /// Whether the per-user active-jobs cap is enforced at all.
    pub active_limit_enabled: bool,
    /// Stamped onto every JobRecord's `executionHost`.
    pub hostname: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            archive_root: "/var/lib/coordinator/archive".to_string(),
            default_job_memory_mb: 1024,
            max_job_memory_mb: 4096,
            max_system_memory_mb: 8192,
            active_limit_enabled: false,
            hostname: "localhost".to_string(),
        }
    }
}
