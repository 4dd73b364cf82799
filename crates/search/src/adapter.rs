//! Boundary traits for the collaborators the search core consumes.

use tether_core::{uri, Cluster, ClusterUri, ResourceKind, ResourceSearchResult, SearchCause};

/// Searches one resource kind inside a cluster.
///
/// Implementations must surface every failure as a [`SearchCause`]; the
/// aggregator converts them into per-cluster errors.
#[async_trait::async_trait]
pub trait ResourceAdapter: Send + Sync {
    fn kind(&self) -> ResourceKind;

    async fn search(&self, cluster: &ClusterUri, query: &str) -> Result<Vec<ResourceSearchResult>, SearchCause>;
}

/// Read access to the clusters known to the console.
pub trait ClusterRegistry: Send + Sync {
    fn clusters(&self) -> Vec<Cluster>;

    fn find_cluster(&self, uri: &ClusterUri) -> Option<Cluster> {
        self.clusters().into_iter().find(|c| &c.uri == uri)
    }
}

impl ClusterRegistry for Vec<Cluster> {
    fn clusters(&self) -> Vec<Cluster> { self.clone() }
}

/// Resolves display names for cluster and resource URIs.
pub struct ClusterNameResolver<'a> {
    registry: &'a dyn ClusterRegistry,
}

impl<'a> ClusterNameResolver<'a> {
    pub fn new(registry: &'a dyn ClusterRegistry) -> Self { Self { registry } }

    /// Registry name when the cluster is known, otherwise the name encoded in the URI.
    pub fn cluster_name(&self, uri: &str) -> String {
        let Ok(cluster_uri) = uri::ensure_cluster_uri(uri) else {
            return uri.to_string();
        };
        match self.registry.find_cluster(&cluster_uri) {
            Some(c) => c.name,
            None => cluster_uri.name().to_string(),
        }
    }

    /// Cluster name for item captions; omitted when only one cluster exists.
    pub fn optional_cluster_name(&self, uri: &str) -> Option<String> {
        if self.registry.clusters().len() == 1 {
            return None;
        }
        Some(self.cluster_name(uri))
    }
}
