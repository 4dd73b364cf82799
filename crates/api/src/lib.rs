//! Tether public API façade (in-process).
//!
//! Frontends (the CLI today) depend on the [`TetherApi`] trait and the types
//! here. The in-process implementation serves a fixture through the search,
//! catalog and session crates directly.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tether_catalog::{
    Acl, CatalogKind, DatabaseForm, DatabaseFormError, Integration, JoinLink, ParticipantMode, RegisterDatabaseRequest,
    ResourceSpec,
};
use tether_core::{Cluster, ClusterUri, FilterSet, SearchResult};
use tether_search::{
    filter_actions, CrossClusterResourceSearchResult, CrossClusterSearch, PickerEvent, PickerHandle, SearchConfig,
};
use tracing::info;

pub mod fixture;

pub use fixture::{Fixture, FixtureAdapter, FixtureCluster};

/// API errors suitable for transport over RPC later.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("capability: {0}")]
    Capability(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Catalog query: optional search text and a preselected kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub search: String,
    pub kind: Option<CatalogKind>,
}

/// Console API surface.
#[async_trait::async_trait]
pub trait TetherApi: Send + Sync {
    /// Every cluster known to the console, connected or not.
    async fn clusters(&self) -> ApiResult<Vec<Cluster>>;

    /// Cross-cluster resource search under the given filters.
    async fn search(&self, query: &str, filters: &FilterSet) -> ApiResult<CrossClusterResourceSearchResult>;

    /// Filter actions still selectable for the input.
    async fn filter_actions(&self, input: &str, filters: &FilterSet) -> ApiResult<Vec<SearchResult>>;

    /// Start an interactive picker; events in, snapshots out.
    fn picker(&self) -> (tokio::sync::mpsc::Sender<PickerEvent>, PickerHandle);

    /// Enrollable resources with access stamped, accessible first.
    async fn catalog(&self, acl: &Acl, query: &CatalogQuery) -> ApiResult<Vec<ResourceSpec>>;

    async fn join_links(&self, cluster_id: &str, sid: &str, modes: &[ParticipantMode]) -> ApiResult<Vec<JoinLink>>;

    /// Validate (and normalize) an integration create request.
    async fn validate_integration(&self, integration: Integration) -> ApiResult<Integration>;

    /// Check a "register a database" form for `cluster` and build the request.
    async fn register_database(&self, cluster: &ClusterUri, acl: &Acl, form: &DatabaseForm) -> ApiResult<RegisterDatabaseRequest>;
}

// ----------------- In-process implementation -----------------

/// In-process implementation over a loaded fixture.
pub struct InProcApi {
    fixture: Arc<Fixture>,
    search: Arc<CrossClusterSearch>,
}

impl InProcApi {
    pub fn new(fixture: Fixture, config: SearchConfig) -> Self {
        let fixture = Arc::new(fixture);
        let search = Arc::new(CrossClusterSearch::new(FixtureAdapter::all(&fixture), config));
        Self { fixture, search }
    }

    pub fn fixture(&self) -> &Fixture { &self.fixture }
}

#[async_trait::async_trait]
impl TetherApi for InProcApi {
    async fn clusters(&self) -> ApiResult<Vec<Cluster>> {
        use tether_search::ClusterRegistry;
        Ok(self.fixture.clusters())
    }

    async fn search(&self, query: &str, filters: &FilterSet) -> ApiResult<CrossClusterResourceSearchResult> {
        let t0 = Instant::now();
        let clusters = self.clusters().await?;
        if let Some(uri) = filters.cluster() {
            if !clusters.iter().any(|c| &c.uri == uri) {
                return Err(ApiError::NotFound(format!("cluster {}", uri)));
            }
        }
        let out = self.search.search(&clusters, query, filters).await;
        info!(query = %query, results = out.results.len(), errors = out.errors.len(), took_ms = %t0.elapsed().as_millis(), "api: search ok");
        Ok(out)
    }

    async fn filter_actions(&self, input: &str, filters: &FilterSet) -> ApiResult<Vec<SearchResult>> {
        Ok(filter_actions(&self.clusters().await?, filters, input))
    }

    fn picker(&self) -> (tokio::sync::mpsc::Sender<PickerEvent>, PickerHandle) {
        let registry: Arc<dyn tether_search::ClusterRegistry> = self.fixture.clone();
        tether_search::spawn_picker(Arc::clone(&self.search), registry, 64)
    }

    async fn catalog(&self, acl: &Acl, query: &CatalogQuery) -> ApiResult<Vec<ResourceSpec>> {
        let mut specs = tether_catalog::make_catalog(acl, &tether_catalog::builtin_specs());
        if let Some(kind) = query.kind {
            specs = tether_catalog::preselect(kind, specs);
        }
        Ok(tether_catalog::search_catalog(&specs, &query.search).into_iter().cloned().collect())
    }

    async fn join_links(&self, cluster_id: &str, sid: &str, modes: &[ParticipantMode]) -> ApiResult<Vec<JoinLink>> {
        tether_catalog::join_links(cluster_id, sid, modes).map_err(|e| ApiError::Validation(e.to_string()))
    }

    async fn validate_integration(&self, mut integration: Integration) -> ApiResult<Integration> {
        integration.check_and_set_defaults().map_err(|e| ApiError::Validation(e.to_string()))?;
        Ok(integration)
    }

    async fn register_database(&self, cluster: &ClusterUri, acl: &Acl, form: &DatabaseForm) -> ApiResult<RegisterDatabaseRequest> {
        let Some(c) = self.fixture.find(cluster) else {
            return Err(ApiError::NotFound(format!("cluster {}", cluster)));
        };
        let req = form.to_request(acl).map_err(|e| match e {
            DatabaseFormError::AccessDenied => ApiError::Capability(e.to_string()),
            _ => ApiError::Validation(e.to_string()),
        })?;
        if c.databases.iter().any(|d| d.name == req.name) {
            return Err(ApiError::Conflict(format!("database {:?} already exists in {}", req.name, c.name)));
        }
        info!(cluster = %cluster, name = %req.name, uri = %req.uri, "api: database registration accepted");
        Ok(req)
    }
}
