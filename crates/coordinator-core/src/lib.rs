//! The admission-and-resolution pipeline for cluster job submissions.
//!
//! This crate is deliberately free of any concrete backend: it defines the
//! data model, the error taxonomy, the trait boundaries to the four
//! external collaborators, and the `Coordinator` that drives them through
//! `submit`/`kill`. Sibling crates implement the traits; the root binary
//! wires everything together.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod ports;

#[cfg(test)]
mod testutil;

pub use config::CoordinatorConfig;
pub use error::{CoordinatorError, ErrorKind};
pub use model::{
    archive_location, Application, Cluster, Command, ExecutionPlan, JobMetadata, JobRecord,
    JobRequest, JobStatus, RuntimeBinding,
};
pub use pipeline::{Coordinator, RESOLVE_FAILURE_MESSAGE};
pub use ports::{
    ActiveLimitPolicy, CatalogError, CatalogStore, FixedLimitPolicy, KillError, Killer,
    MetricsSink, NodeState, NodeStateError, Resolver, ResolutionError,
};
