//! Fixture-backed cluster registry and resource adapters.
//!
//! A fixture describes clusters, the resources each one holds and failures to
//! inject per resource kind. It stands in for live cluster connections.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_core::{
    Cluster, ClusterUri, Database, Kube, Label, Labels, ResourceKind, ResourceSearchResult, SearchCause, SearchableResource, Server,
};
use tether_search::rank::search_terms;
use tether_search::{ClusterRegistry, ResourceAdapter};
use tracing::debug;

use crate::{ApiError, ApiResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Server UUID.
    pub name: String,
    pub hostname: String,
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub tunnel: bool,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub protocol: String,
    #[serde(rename = "type", default = "default_db_type")]
    pub db_type: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

fn default_db_type() -> String { "self-hosted".to_string() }

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeEntry {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Makes searches of one resource kind fail on a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedFailure {
    pub resource: ResourceKind,
    pub cause: SearchCause,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureCluster {
    pub uri: ClusterUri,
    pub name: String,
    #[serde(default = "default_connected")]
    pub connected: bool,
    /// Simulated latency of every adapter call on this cluster.
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    #[serde(default)]
    pub databases: Vec<DatabaseEntry>,
    #[serde(default)]
    pub kubes: Vec<KubeEntry>,
    #[serde(default)]
    pub failures: Vec<InjectedFailure>,
}

fn default_connected() -> bool { true }

fn labels(map: &BTreeMap<String, String>) -> Labels { map.iter().map(|(k, v)| Label::new(k, v)).collect() }

impl FixtureCluster {
    pub fn cluster(&self) -> Cluster { Cluster { uri: self.uri.clone(), name: self.name.clone(), connected: self.connected } }

    fn failure(&self, kind: ResourceKind) -> Option<&SearchCause> {
        self.failures.iter().find(|f| f.resource == kind).map(|f| &f.cause)
    }

    fn resources(&self, kind: ResourceKind) -> Vec<ResourceSearchResult> {
        match kind {
            ResourceKind::Server => self
                .servers
                .iter()
                .map(|s| {
                    Server {
                        uri: self.uri.resource(kind, &s.name),
                        name: s.name.clone(),
                        hostname: s.hostname.clone(),
                        addr: s.addr.clone(),
                        tunnel: s.tunnel,
                        labels: labels(&s.labels),
                    }
                    .into()
                })
                .collect(),
            ResourceKind::Database => self
                .databases
                .iter()
                .map(|d| {
                    Database {
                        uri: self.uri.resource(kind, &d.name),
                        name: d.name.clone(),
                        desc: d.desc.clone(),
                        protocol: d.protocol.clone(),
                        db_type: d.db_type.clone(),
                        labels: labels(&d.labels),
                    }
                    .into()
                })
                .collect(),
            ResourceKind::Kube => self
                .kubes
                .iter()
                .map(|k| Kube { uri: self.uri.resource(kind, &k.name), name: k.name.clone(), labels: labels(&k.labels) }.into())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub clusters: Vec<FixtureCluster>,
}

impl Fixture {
    /// JSON when the extension is `.json`, YAML otherwise.
    pub fn load(path: &Path) -> ApiResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ApiError::NotFound(format!("{}: {}", path.display(), e)))?;
        let is_json = path.extension().map_or(false, |e| e.eq_ignore_ascii_case("json"));
        if is_json { Self::from_json(&text) } else { Self::from_yaml(&text) }
    }

    pub fn from_yaml(text: &str) -> ApiResult<Self> {
        let f: Self = serde_yaml::from_str(text).map_err(|e| ApiError::Validation(format!("fixture yaml: {}", e)))?;
        f.validate()
    }

    pub fn from_json(text: &str) -> ApiResult<Self> {
        let f: Self = serde_json::from_str(text).map_err(|e| ApiError::Validation(format!("fixture json: {}", e)))?;
        f.validate()
    }

    fn validate(self) -> ApiResult<Self> {
        for (i, c) in self.clusters.iter().enumerate() {
            if self.clusters[..i].iter().any(|o| o.uri == c.uri) {
                return Err(ApiError::Validation(format!("duplicate cluster {}", c.uri)));
            }
            let names = c
                .servers
                .iter()
                .map(|s| s.name.as_str())
                .chain(c.databases.iter().map(|d| d.name.as_str()))
                .chain(c.kubes.iter().map(|k| k.name.as_str()));
            for name in names {
                if name.is_empty() || name.contains('/') {
                    return Err(ApiError::Validation(format!("invalid resource name {:?} in cluster {}", name, c.uri)));
                }
            }
        }
        Ok(self)
    }

    pub fn find(&self, uri: &ClusterUri) -> Option<&FixtureCluster> { self.clusters.iter().find(|c| &c.uri == uri) }
}

impl ClusterRegistry for Fixture {
    fn clusters(&self) -> Vec<Cluster> { self.clusters.iter().map(FixtureCluster::cluster).collect() }
}

fn matches_all<R: SearchableResource>(r: &R, terms: &[String]) -> bool {
    terms.iter().all(|t| {
        R::FIELDS.iter().any(|f| r.field(*f).to_lowercase().contains(t.as_str()))
            || r.labels().iter().any(|l| l.name.to_lowercase().contains(t.as_str()) || l.value.to_lowercase().contains(t.as_str()))
    })
}

/// Keeps resources where every search term appears in some field or label.
fn matches_query(r: &ResourceSearchResult, terms: &[String]) -> bool {
    match r {
        ResourceSearchResult::Server(h) => matches_all(&h.resource, terms),
        ResourceSearchResult::Database(h) => matches_all(&h.resource, terms),
        ResourceSearchResult::Kube(h) => matches_all(&h.resource, terms),
    }
}

/// Searches one resource kind of the fixture's clusters.
pub struct FixtureAdapter {
    kind: ResourceKind,
    fixture: Arc<Fixture>,
}

impl FixtureAdapter {
    pub fn new(kind: ResourceKind, fixture: Arc<Fixture>) -> Self { Self { kind, fixture } }

    /// One adapter per resource kind, in the order filter actions list them.
    pub fn all(fixture: &Arc<Fixture>) -> Vec<Arc<dyn ResourceAdapter>> {
        ResourceKind::ALL.iter().map(|k| Arc::new(Self::new(*k, Arc::clone(fixture))) as Arc<dyn ResourceAdapter>).collect()
    }
}

#[async_trait::async_trait]
impl ResourceAdapter for FixtureAdapter {
    fn kind(&self) -> ResourceKind { self.kind }

    async fn search(&self, cluster: &ClusterUri, query: &str) -> Result<Vec<ResourceSearchResult>, SearchCause> {
        metrics::counter!("fixture_adapter_calls_total", 1u64, "kind" => self.kind.plural());
        let Some(c) = self.fixture.find(cluster) else {
            return Err(SearchCause::Unavailable(format!("unknown cluster {}", cluster)));
        };
        if c.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(c.delay_ms)).await;
        }
        if let Some(cause) = c.failure(self.kind) {
            debug!(cluster = %cluster, kind = %self.kind, %cause, "injected failure");
            return Err(cause.clone());
        }
        let terms = search_terms(query);
        let found: Vec<ResourceSearchResult> = c.resources(self.kind).into_iter().filter(|r| matches_query(r, &terms)).collect();
        debug!(cluster = %cluster, kind = %self.kind, found = found.len(), "fixture search");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
clusters:
  - uri: /clusters/root
    name: teleport.example.com
    databases:
      - name: db.example.com
        protocol: postgres
        labels: { env: prod }
      - name: mysql-staging
        protocol: mysql
    kubes:
      - name: k8s-prod
  - uri: /clusters/leaf
    name: leaf.example.com
    failures:
      - resource: database
        cause: { kind: expired_credentials, message: "certificate has expired" }
"#;

    fn fixture() -> Arc<Fixture> { Arc::new(Fixture::from_yaml(YAML).expect("fixture")) }

    #[tokio::test]
    async fn every_term_must_match_something() {
        let f = fixture();
        let dbs = FixtureAdapter::new(ResourceKind::Database, f);
        let root = ClusterUri::root("root");
        assert_eq!(dbs.search(&root, "db.example.com").await.expect("search").len(), 1);
        assert_eq!(dbs.search(&root, "postgres prod").await.expect("search").len(), 1, "field and label terms combine");
        assert_eq!(dbs.search(&root, "").await.expect("search").len(), 2);
        assert!(dbs.search(&root, "postgres staging").await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn injected_and_unknown_cluster_failures() {
        let f = fixture();
        let dbs = FixtureAdapter::new(ResourceKind::Database, Arc::clone(&f));
        let err = dbs.search(&ClusterUri::root("leaf"), "db").await.expect_err("injected");
        assert!(matches!(err, SearchCause::ExpiredCredentials(_)));
        let kubes = FixtureAdapter::new(ResourceKind::Kube, f);
        assert!(kubes.search(&ClusterUri::root("leaf"), "").await.expect("other kinds unaffected").is_empty());
        let unknown = kubes.search(&ClusterUri::root("gone"), "").await.expect_err("unknown cluster");
        assert!(matches!(unknown, SearchCause::Unavailable(_)));
    }

    #[test]
    fn registry_and_validation() {
        let f = fixture();
        let clusters = f.clusters();
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.connected));
        let dup = "clusters:\n  - { uri: /clusters/a, name: a }\n  - { uri: /clusters/a, name: b }\n";
        assert!(matches!(Fixture::from_yaml(dup), Err(ApiError::Validation(_))));
        assert!(matches!(Fixture::from_yaml("clusters: [{ uri: not-a-uri, name: x }]"), Err(ApiError::Validation(_))));
        let slash = "clusters:\n  - uri: /clusters/a\n    name: a\n    kubes: [{ name: leaves/b/kubes/x }]\n";
        assert!(matches!(Fixture::from_yaml(slash), Err(ApiError::Validation(_))));
        let empty = "clusters:\n  - uri: /clusters/a\n    name: a\n    servers: [{ name: '', hostname: h }]\n";
        assert!(matches!(Fixture::from_yaml(empty), Err(ApiError::Validation(_))));
    }
}
