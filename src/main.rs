//! `coordinatord` — a local harness for the admission coordinator.
//!
//! The REST transport is explicitly out of scope for this service (spec
//! §1): something still has to drive `Coordinator::submit`/`kill` for local
//! testing and operational use, so this binary is that something. It is not
//! a server; it loads configuration, wires the sibling collaborator crates
//! together, runs a single operation, and exits.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use coordinator_core::{CatalogStore, JobMetadata, JobRequest, NodeState, Resolver};
use coordinator::output::{OperationResult, OutputWriter};
use coordinator::{build_coordinator, CliError, CoordinatorSettings, Result};
use node_state::LocalNodeState;
use resolver::{CatalogResolver, Offering};
use serde::Deserialize;

#[derive(Parser)]
#[command(
    name = "coordinatord",
    version,
    about = "Local admission-pipeline harness for the cluster-job coordinator"
)]
struct Cli {
    /// Path to a TOML config file. Falls back to `./coordinator.toml`, then
    /// `~/.coordinator/coordinator.toml`, then built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON Lines instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug-level logging regardless of `RUST_LOG`.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Back the Catalog Store with SQLite at this path instead of the
    /// in-memory store. Seed data in the config file only populates the
    /// in-memory store; a SQLite catalog is expected to already be
    /// populated by its owning deployment.
    #[arg(long, global = true)]
    sqlite: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job request read from a JSON file.
    Submit {
        /// Path to a JSON file describing the `JobRequest` (see
        /// `RequestFile` for the accepted shape).
        request_path: PathBuf,
    },
    /// Kill an admitted job on this node.
    Kill {
        job_id: String,
        reason: String,
    },
    /// Print the current Prometheus metrics text exposition.
    Metrics,
}

/// On-disk shape of a submitted job request. Kept separate from
/// `coordinator_core::JobRequest` (which deliberately has no `Deserialize`
/// impl — it is an immutable domain type, not a wire format) the same way
/// `CoordinatorSettings` is kept separate from `CoordinatorConfig`.
#[derive(Debug, Deserialize)]
struct RequestFile {
    id: Option<String>,
    name: String,
    user: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    command_args: Option<Vec<String>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    memory_mb: Option<u64>,
    #[serde(default)]
    criteria: std::collections::HashMap<String, String>,
    #[serde(default)]
    client_host: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    labels: std::collections::HashMap<String, String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl RequestFile {
    fn into_request_and_metadata(self) -> (JobRequest, JobMetadata) {
        let request = JobRequest {
            id: self.id,
            name: self.name,
            user: self.user,
            version: self.version,
            tags: self.tags.into_iter().collect(),
            command_args: self.command_args,
            description: self.description,
            requested_memory_mb: self.memory_mb,
            criteria: self.criteria,
        };
        let metadata = JobMetadata {
            client_host: self.client_host,
            user_agent: self.user_agent,
            labels: self.labels,
        };
        (request, metadata)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    coordinator::logging::init_logging(cli.verbose, cli.json);

    let settings = match &cli.config {
        Some(path) => CoordinatorSettings::load(path)?,
        None => CoordinatorSettings::load_with_fallback(),
    };
    let writer = OutputWriter::new(cli.json);

    let result = run(&cli, &settings, &writer).await;
    if let Err(err) = &result {
        writer.operation_result(&OperationResult {
            operation: operation_name(&cli.command).to_string(),
            success: false,
            job_id: None,
            error: Some(err.to_string()),
            status_hint: Some(err.status_hint()),
        });
    }
    result.map_err(anyhow::Error::from)
}

fn operation_name(command: &Commands) -> &'static str {
    match command {
        Commands::Submit { .. } => "submit",
        Commands::Kill { .. } => "kill",
        Commands::Metrics => "metrics",
    }
}

async fn run(cli: &Cli, settings: &CoordinatorSettings, writer: &OutputWriter) -> Result<()> {
    match &cli.command {
        Commands::Submit { request_path } => run_submit(cli, settings, writer, request_path).await,
        Commands::Kill { job_id, reason } => run_kill(cli, settings, writer, job_id, reason).await,
        Commands::Metrics => {
            writer.info(&coord_metrics::metrics_text());
            Ok(())
        }
    }
}

async fn run_submit(
    cli: &Cli,
    settings: &CoordinatorSettings,
    writer: &OutputWriter,
    request_path: &PathBuf,
) -> Result<()> {
    let content = std::fs::read_to_string(request_path)
        .map_err(|e| CliError::RequestFile(format!("{}: {e}", request_path.display())))?;
    let request_file: RequestFile = serde_json::from_str(&content)
        .map_err(|e| CliError::RequestFile(format!("invalid request JSON: {e}")))?;
    let (request, metadata) = request_file.into_request_and_metadata();

    let (catalog, resolver, node_state) = build_collaborators(cli, settings).await?;
    let metrics = Arc::new(coord_metrics::PrometheusMetricsSink::new());
    let killer: Arc<dyn coordinator_core::Killer> = Arc::new(killer::LocalKiller::new(node_state.clone()));

    let coordinator = build_coordinator(settings, catalog, resolver, node_state, killer, metrics);

    let job_id = coordinator.submit(request, metadata).await?;
    writer.operation_result(&OperationResult {
        operation: "submit".to_string(),
        success: true,
        job_id: Some(job_id),
        error: None,
        status_hint: None,
    });
    Ok(())
}

async fn run_kill(
    cli: &Cli,
    settings: &CoordinatorSettings,
    writer: &OutputWriter,
    job_id: &str,
    reason: &str,
) -> Result<()> {
    let (catalog, resolver, node_state) = build_collaborators(cli, settings).await?;
    let metrics = Arc::new(coord_metrics::PrometheusMetricsSink::new());
    let killer: Arc<dyn coordinator_core::Killer> = Arc::new(killer::LocalKiller::new(node_state.clone()));

    let coordinator = build_coordinator(settings, catalog, resolver, node_state, killer, metrics);

    coordinator.kill(job_id, reason).await?;
    writer.operation_result(&OperationResult {
        operation: "kill".to_string(),
        success: true,
        job_id: Some(job_id.to_string()),
        error: None,
        status_hint: None,
    });
    Ok(())
}

/// Builds the Catalog Store, Resolver, and Node State for this invocation.
/// Each CLI invocation is a fresh process, so an in-memory Node State here
/// only tracks jobs admitted by *this* invocation; a real deployment runs
/// the coordinator as a long-lived service so the ledger persists across
/// submissions.
async fn build_collaborators(
    cli: &Cli,
    settings: &CoordinatorSettings,
) -> Result<(
    Arc<dyn CatalogStore>,
    Arc<dyn Resolver>,
    Arc<dyn NodeState>,
)> {
    let catalog: Arc<dyn CatalogStore> = match &cli.sqlite {
        Some(path) => Arc::new(
            catalog_store::SqliteCatalogStore::open(path.to_string_lossy().as_ref())
                .await
                .map_err(|e| CliError::Config(format!("failed to open sqlite catalog: {e}")))?,
        ),
        None => {
            let store = catalog_store::InMemoryCatalogStore::new();
            seed_catalog(&store, settings).await;
            Arc::new(store)
        }
    };

    let resolver = CatalogResolver::new();
    for offering in &settings.seed.offerings {
        resolver
            .register(Offering {
                cluster_id: offering.cluster_id.clone(),
                command_id: offering.command_id.clone(),
                application_ids: offering.application_ids.clone(),
                required_tags: offering.required_tags.iter().cloned().collect(),
            })
            .await;
    }
    let resolver: Arc<dyn Resolver> = Arc::new(resolver);

    let node_state: Arc<dyn NodeState> = Arc::new(LocalNodeState::new());

    Ok((catalog, resolver, node_state))
}

async fn seed_catalog(store: &catalog_store::InMemoryCatalogStore, settings: &CoordinatorSettings) {
    for cluster_id in &settings.seed.clusters {
        store
            .seed_cluster(coordinator_core::Cluster { id: cluster_id.clone() })
            .await;
    }
    for command in &settings.seed.commands {
        store
            .seed_command(coordinator_core::Command {
                id: command.id.clone(),
                default_memory_mb: command.default_memory_mb,
            })
            .await;
    }
    for app_id in &settings.seed.applications {
        store
            .seed_application(coordinator_core::Application { id: app_id.clone() })
            .await;
    }
}
