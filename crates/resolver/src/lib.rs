//! A catalog-driven `Resolver`: a registry of cluster/command offerings,
//! each gated by the tags it requires, scored against an incoming request.
//!
//! This mirrors the register-then-look-up shape used elsewhere for
//! matching a request against a set of registered candidates: callers add
//! offerings up front (typically from the same catalog data the
//! `CatalogStore` serves), and `resolve` picks the best match at request
//! time rather than the core knowing anything about matching criteria.

use std::collections::BTreeSet;

use async_trait::async_trait;
use coordinator_core::{ExecutionPlan, JobRequest, ResolutionError, Resolver};
use tokio::sync::RwLock;
use tracing::debug;

/// A cluster/command pairing this node can offer, gated by the tags a
/// request must carry for the pairing to apply.
#[derive(Debug, Clone)]
pub struct Offering {
    pub cluster_id: String,
    pub command_id: String,
    pub application_ids: Vec<String>,
    pub required_tags: BTreeSet<String>,
}

/// Resolves requests against a list of registered offerings. Offerings are
/// tried in registration order; the first whose `required_tags` is a
/// subset of the request's tags wins.
pub struct CatalogResolver {
    offerings: RwLock<Vec<Offering>>,
}

impl CatalogResolver {
    pub fn new() -> Self {
        Self { offerings: RwLock::new(Vec::new()) }
    }

    pub async fn register(&self, offering: Offering) {
        self.offerings.write().await.push(offering);
    }
}

impl Default for CatalogResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for CatalogResolver {
    async fn resolve(
        &self,
        job_id: &str,
        request: &JobRequest,
    ) -> Result<ExecutionPlan, ResolutionError> {
        let offerings = self.offerings.read().await;
        let matched = offerings
            .iter()
            .find(|o| o.required_tags.is_subset(&request.tags));

        match matched {
            Some(offering) => {
                debug!(job_id, cluster = %offering.cluster_id, command = %offering.command_id, "resolved");
                Ok(ExecutionPlan {
                    cluster_id: offering.cluster_id.clone(),
                    command_id: offering.command_id.clone(),
                    application_ids: offering.application_ids.clone(),
                })
            }
            None => Err(ResolutionError(format!(
                "no cluster/command combination satisfies request tags for job {job_id}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tags: &[&str]) -> JobRequest {
        JobRequest {
            id: None,
            name: "job".to_string(),
            user: "alice".to_string(),
            version: "1.0".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            command_args: None,
            description: None,
            requested_memory_mb: None,
            criteria: Default::default(),
        }
    }

    #[tokio::test]
    async fn resolves_to_first_matching_offering() {
        let resolver = CatalogResolver::new();
        resolver
            .register(Offering {
                cluster_id: "C1".to_string(),
                command_id: "K1".to_string(),
                application_ids: vec!["A1".to_string()],
                required_tags: ["gpu".to_string()].into_iter().collect(),
            })
            .await;

        let plan = resolver.resolve("J1", &request(&["gpu", "batch"])).await.unwrap();
        assert_eq!(plan.cluster_id, "C1");
        assert_eq!(plan.command_id, "K1");
    }

    #[tokio::test]
    async fn fails_when_no_offering_matches() {
        let resolver = CatalogResolver::new();
        resolver
            .register(Offering {
                cluster_id: "C1".to_string(),
                command_id: "K1".to_string(),
                application_ids: vec![],
                required_tags: ["gpu".to_string()].into_iter().collect(),
            })
            .await;

        let err = resolver.resolve("J1", &request(&["batch"])).await.unwrap_err();
        assert!(err.0.contains("no cluster/command combination"));
    }
}
