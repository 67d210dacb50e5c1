/*!
 * Coordinator - admission service for a cluster-job execution platform.
 *
 * Accepts or rejects job submissions, resolves them against the cluster
 * catalog, enforces resource and policy limits, and hands accepted jobs to
 * the local node for execution. The REST transport, persistence schema,
 * authentication, and the real node launcher are external collaborators;
 * this crate wires their interfaces (defined in `coordinator-core`) to the
 * concrete implementations in the sibling crates and exposes a small CLI
 * harness for local submission/kill exercises.
 */

pub mod config;
pub mod error;
pub mod logging;
pub mod output;

use std::sync::Arc;

use coordinator_core::{ActiveLimitPolicy, CatalogStore, Coordinator, Killer, MetricsSink, NodeState, Resolver};

pub use config::CoordinatorSettings;
pub use error::{CliError, Result};

/// Assembles a `Coordinator` from concrete collaborator implementations.
/// Kept free-standing rather than a method on `Coordinator` itself so the
/// pipeline crate never has to know about the backend crates or how a
/// deployment chooses between them.
#[allow(clippy::too_many_arguments)]
pub fn build_coordinator(
    settings: &CoordinatorSettings,
    catalog: Arc<dyn CatalogStore>,
    resolver: Arc<dyn Resolver>,
    node_state: Arc<dyn NodeState>,
    killer: Arc<dyn Killer>,
    metrics: Arc<dyn MetricsSink>,
) -> Coordinator {
    let active_limit: Arc<dyn ActiveLimitPolicy> =
        Arc::new(config::ConfiguredLimitPolicy::new(&settings.active_limit));
    Coordinator::new(
        settings.to_pipeline_config(),
        catalog,
        resolver,
        node_state,
        killer,
        metrics,
        active_limit,
    )
}
