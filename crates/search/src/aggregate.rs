//! Cross-cluster fan-out/fan-in of resource searches.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tether_core::{Cluster, FilterSet, ResourceSearchError, ResourceSearchResult, SearchCause};
use tracing::{debug, info, warn};

use crate::adapter::ResourceAdapter;
use crate::rank::rank_results;
use crate::SearchConfig;

/// Merged outcome of one query across every in-scope cluster.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrossClusterResourceSearchResult {
    /// Ranked matches of the clusters that answered.
    pub results: Vec<ResourceSearchResult>,
    /// At most one entry per failed cluster.
    pub errors: Vec<ResourceSearchError>,
    /// Query and filters this result was produced for.
    pub search: String,
    pub filters: FilterSet,
}

/// Runs a query against every in-scope cluster's adapters concurrently.
///
/// A failing cluster never fails the whole search; it contributes an error
/// entry and no results.
pub struct CrossClusterSearch {
    adapters: Vec<Arc<dyn ResourceAdapter>>,
    config: SearchConfig,
}

impl CrossClusterSearch {
    pub fn new(adapters: Vec<Arc<dyn ResourceAdapter>>, config: SearchConfig) -> Self { Self { adapters, config } }

    pub fn config(&self) -> &SearchConfig { &self.config }

    pub async fn search(&self, clusters: &[Cluster], query: &str, filters: &FilterSet) -> CrossClusterResourceSearchResult {
        let started = Instant::now();
        let in_scope: Vec<&Cluster> = clusters
            .iter()
            .filter(|c| filters.cluster().map_or(true, |uri| &c.uri == uri))
            .filter(|c| {
                if !c.connected {
                    debug!(cluster = %c.uri, "skipping disconnected cluster");
                }
                c.connected
            })
            .collect();
        let adapters: Vec<&Arc<dyn ResourceAdapter>> = self
            .adapters
            .iter()
            .filter(|a| filters.resource_type().map_or(true, |k| a.kind() == k))
            .collect();
        info!(query = %query, clusters = in_scope.len(), adapters = adapters.len(), "cross-cluster search");

        let outcomes = join_all(in_scope.iter().map(|c| self.search_cluster(c, query, &adapters))).await;

        let mut merged = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(mut found) => merged.append(&mut found),
                Err(err) => {
                    let retryable = if err.is_retryable() { "true" } else { "false" };
                    metrics::counter!("search_cluster_errors_total", 1u64, "retryable" => retryable);
                    warn!(cluster = %err.cluster_uri, kind = %err.resource_kind, cause = %err.cause, "cluster search failed");
                    errors.push(err);
                }
            }
        }
        metrics::counter!("search_clusters_total", in_scope.len() as u64);
        let results = rank_results(merged, query, &self.config.weights, self.config.limit);
        metrics::histogram!("search_eval_ms", started.elapsed().as_secs_f64() * 1_000.0);
        debug!(results = results.len(), errors = errors.len(), "cross-cluster search settled");
        CrossClusterResourceSearchResult { results, errors, search: query.to_string(), filters: filters.clone() }
    }

    // All adapters of one cluster run concurrently; the first failure in adapter
    // order becomes the cluster's error and its other results are dropped.
    async fn search_cluster(
        &self,
        cluster: &Cluster,
        query: &str,
        adapters: &[&Arc<dyn ResourceAdapter>],
    ) -> Result<Vec<ResourceSearchResult>, ResourceSearchError> {
        let calls = adapters.iter().map(|adapter| async move {
            let fut = adapter.search(&cluster.uri, query);
            let res = match self.config.call_timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .unwrap_or_else(|_| Err(SearchCause::Timeout(limit.as_millis() as u64))),
                None => fut.await,
            };
            (adapter.kind(), res)
        });
        let mut found = Vec::new();
        for (kind, res) in join_all(calls).await {
            match res {
                Ok(mut v) => found.append(&mut v),
                Err(cause) => return Err(ResourceSearchError::new(cluster.uri.clone(), kind, cause)),
            }
        }
        debug!(cluster = %cluster.uri, found = found.len(), "cluster search done");
        Ok(found)
    }
}
