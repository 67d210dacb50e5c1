//! Configuration structures and defaults for the coordinator binary.
//!
//! Loaded from a TOML file with the same fallback chain the rest of this
//! workspace's tools use: project-local file, then user config, then
//! built-in defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use coordinator_core::CoordinatorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// Per-user active-jobs cap (spec §6: `activeLimit.userLimit(user)`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActiveLimitSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_user_limit")]
    pub default_limit: u64,
    #[serde(default)]
    pub per_user: HashMap<String, u64>,
}

fn default_user_limit() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    #[serde(default = "default_job_memory")]
    pub default_job_memory_mb: u64,
    #[serde(default = "max_job_memory")]
    pub max_job_memory_mb: u64,
    #[serde(default = "max_system_memory")]
    pub max_system_memory_mb: u64,
}

fn default_job_memory() -> u64 {
    1024
}
fn max_job_memory() -> u64 {
    4096
}
fn max_system_memory() -> u64 {
    8192
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            default_job_memory_mb: default_job_memory(),
            max_job_memory_mb: max_job_memory(),
            max_system_memory_mb: max_system_memory(),
        }
    }
}

/// A cluster/command/application-ids offering the demo resolver can match
/// against a request's tags. Only meaningful for the in-memory catalog the
/// CLI harness wires up for local exercises; a real deployment's catalog and
/// resolver are populated by their own out-of-scope collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferingSeed {
    pub cluster_id: String,
    pub command_id: String,
    #[serde(default)]
    pub application_ids: Vec<String>,
    #[serde(default)]
    pub required_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSeed {
    pub id: String,
    #[serde(default)]
    pub default_memory_mb: Option<u64>,
}

/// Seed data for the demo in-memory catalog and resolver: lets
/// `coordinatord submit` exercise the full pipeline without a running
/// Catalog Store or Resolver service behind it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SeedSettings {
    #[serde(default)]
    pub clusters: Vec<String>,
    #[serde(default)]
    pub commands: Vec<CommandSeed>,
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default)]
    pub offerings: Vec<OfferingSeed>,
}

/// The TOML-shaped settings file. Kept separate from
/// `coordinator_core::CoordinatorConfig` so the pipeline crate never knows
/// about file formats.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoordinatorSettings {
    #[serde(default = "default_archive_root")]
    pub archive_root: String,
    pub hostname: Option<String>,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub active_limit: ActiveLimitSettings,
    #[serde(default)]
    pub seed: SeedSettings,
}

fn default_archive_root() -> String {
    "/var/lib/coordinator/archive".to_string()
}

impl CoordinatorSettings {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("failed to read config file: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse config file: {e}")))
    }

    /// Load configuration with fallback priority:
    /// 1. `./coordinator.toml` (project-specific)
    /// 2. `~/.coordinator/coordinator.toml` (user defaults)
    /// 3. Built-in defaults
    pub fn load_with_fallback() -> Self {
        if let Ok(settings) = Self::load(Path::new("coordinator.toml")) {
            return settings;
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".coordinator").join("coordinator.toml");
            if let Ok(settings) = Self::load(&user_config) {
                return settings;
            }
        }

        Self::default_with_hostname()
    }

    fn default_with_hostname() -> Self {
        Self {
            archive_root: default_archive_root(),
            hostname: None,
            memory: MemorySettings::default(),
            active_limit: ActiveLimitSettings::default(),
            seed: SeedSettings::default(),
        }
    }

    /// Resolve into the plain `CoordinatorConfig` the pipeline consumes,
    /// auto-detecting the hostname if the file didn't pin one.
    pub fn to_pipeline_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            archive_root: self.archive_root.clone(),
            default_job_memory_mb: self.memory.default_job_memory_mb,
            max_job_memory_mb: self.memory.max_job_memory_mb,
            max_system_memory_mb: self.memory.max_system_memory_mb,
            active_limit_enabled: self.active_limit.enabled,
            hostname: self.hostname.clone().unwrap_or_else(detect_hostname),
        }
    }
}

fn detect_hostname() -> String {
    hostname_from_env().unwrap_or_else(|| "localhost".to_string())
}

fn hostname_from_env() -> Option<String> {
    std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty())
}

/// A config-driven `ActiveLimitPolicy`: per-user overrides, falling back to
/// a default cap.
pub struct ConfiguredLimitPolicy {
    default_limit: u64,
    per_user: HashMap<String, u64>,
}

impl ConfiguredLimitPolicy {
    pub fn new(settings: &ActiveLimitSettings) -> Self {
        Self {
            default_limit: settings.default_limit,
            per_user: settings.per_user.clone(),
        }
    }
}

impl coordinator_core::ActiveLimitPolicy for ConfiguredLimitPolicy {
    fn limit_for(&self, user: &str) -> u64 {
        *self.per_user.get(user).unwrap_or(&self.default_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_example_configuration() {
        let settings = CoordinatorSettings::default_with_hostname();
        let config = settings.to_pipeline_config();
        assert_eq!(config.default_job_memory_mb, 1024);
        assert_eq!(config.max_job_memory_mb, 4096);
        assert_eq!(config.max_system_memory_mb, 8192);
        assert!(!config.active_limit_enabled);
    }

    #[test]
    fn parses_a_full_toml_document() {
        let toml_str = r#"
            archive_root = "/data/archive"
            hostname = "node-7"

            [memory]
            default_job_memory_mb = 2048
            max_job_memory_mb = 8192
            max_system_memory_mb = 16384

            [active_limit]
            enabled = true
            default_limit = 5

            [active_limit.per_user]
            alice = 3
        "#;
        let settings: CoordinatorSettings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.hostname.as_deref(), Some("node-7"));
        assert_eq!(settings.memory.default_job_memory_mb, 2048);
        assert!(settings.active_limit.enabled);

        let policy = ConfiguredLimitPolicy::new(&settings.active_limit);
        use coordinator_core::ActiveLimitPolicy;
        assert_eq!(policy.limit_for("alice"), 3);
        assert_eq!(policy.limit_for("bob"), 5);
    }
}
