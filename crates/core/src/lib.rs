//! Tether core types: clusters, resources, search results, filters.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

pub mod attempt;
pub mod uri;

pub use attempt::Attempt;
pub use uri::{ClusterUri, ResourceUri, UriError};

pub mod prelude {
    pub use super::{
        Attempt, Cluster, ClusterUri, Database, Filter, FilterSet, Kube, Label, LabelMatch, LabelMatchKind,
        ResourceHit, ResourceKind, ResourceMatch, ResourceSearchError, ResourceSearchResult, ResourceUri,
        SearchCause, SearchResult, SearchableResource, Server,
    };
}

/// A cluster known to the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub uri: ClusterUri,
    pub name: String,
    /// False when the cluster has no valid session (e.g. certificate expired).
    #[serde(default = "default_connected")]
    pub connected: bool,
}

fn default_connected() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: &str, value: &str) -> Self { Self { name: name.to_string(), value: value.to_string() } }
}

pub type Labels = SmallVec<[Label; 4]>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Server,
    Database,
    Kube,
}

impl ResourceKind {
    /// Display order of resource-type filter actions.
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Kube, ResourceKind::Server, ResourceKind::Database];

    /// Plural slug, also the identity of a resource-type filter.
    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Server => "servers",
            ResourceKind::Database => "databases",
            ResourceKind::Kube => "kubes",
        }
    }

    pub(crate) fn uri_segment(self) -> &'static str {
        match self {
            ResourceKind::Server => "servers",
            ResourceKind::Database => "dbs",
            ResourceKind::Kube => "kubes",
        }
    }

    pub(crate) fn from_uri_segment(s: &str) -> Option<Self> {
        match s {
            "servers" => Some(ResourceKind::Server),
            "dbs" => Some(ResourceKind::Database),
            "kubes" => Some(ResourceKind::Kube),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.plural()) }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "servers" | "server" | "node" | "nodes" => Ok(ResourceKind::Server),
            "databases" | "database" | "db" | "dbs" => Ok(ResourceKind::Database),
            "kubes" | "kube" | "kubernetes" => Ok(ResourceKind::Kube),
            other => Err(format!("unknown resource kind: {} (expect servers, databases or kubes)", other)),
        }
    }
}

// ---- Resource records ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub uri: ResourceUri,
    /// Server UUID.
    pub name: String,
    pub hostname: String,
    #[serde(default)]
    pub addr: String,
    /// Connected through a reverse tunnel (no direct address).
    #[serde(default)]
    pub tunnel: bool,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub uri: ResourceUri,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub protocol: String,
    #[serde(rename = "type")]
    pub db_type: String,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Kube {
    pub uri: ResourceUri,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServerField { Name, Hostname, Addr }

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseField { Name, Desc, Protocol, Type }

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KubeField { Name }

/// A resource record whose fields can be matched against search terms.
///
/// Each kind names its fields with its own enum, so a [`ResourceMatch`] can only
/// ever reference a field that exists on the resource it is attached to.
pub trait SearchableResource: Clone + fmt::Debug {
    type Field: Copy + Eq + fmt::Debug + Serialize + 'static;
    const KIND: ResourceKind;
    const FIELDS: &'static [Self::Field];
    /// Field carrying the name shown to the user; weighted higher when ranking.
    const MAIN_FIELD: Self::Field;

    fn uri(&self) -> &ResourceUri;
    fn field(&self, field: Self::Field) -> &str;
    fn labels(&self) -> &[Label];
    fn main_name(&self) -> &str { self.field(Self::MAIN_FIELD) }
}

impl SearchableResource for Server {
    type Field = ServerField;
    const KIND: ResourceKind = ResourceKind::Server;
    const FIELDS: &'static [ServerField] = &[ServerField::Name, ServerField::Hostname, ServerField::Addr];
    const MAIN_FIELD: ServerField = ServerField::Hostname;

    fn uri(&self) -> &ResourceUri { &self.uri }
    fn field(&self, field: ServerField) -> &str {
        match field {
            ServerField::Name => &self.name,
            ServerField::Hostname => &self.hostname,
            ServerField::Addr => &self.addr,
        }
    }
    fn labels(&self) -> &[Label] { &self.labels }
}

impl SearchableResource for Database {
    type Field = DatabaseField;
    const KIND: ResourceKind = ResourceKind::Database;
    const FIELDS: &'static [DatabaseField] =
        &[DatabaseField::Name, DatabaseField::Desc, DatabaseField::Protocol, DatabaseField::Type];
    const MAIN_FIELD: DatabaseField = DatabaseField::Name;

    fn uri(&self) -> &ResourceUri { &self.uri }
    fn field(&self, field: DatabaseField) -> &str {
        match field {
            DatabaseField::Name => &self.name,
            DatabaseField::Desc => &self.desc,
            DatabaseField::Protocol => &self.protocol,
            DatabaseField::Type => &self.db_type,
        }
    }
    fn labels(&self) -> &[Label] { &self.labels }
}

impl SearchableResource for Kube {
    type Field = KubeField;
    const KIND: ResourceKind = ResourceKind::Kube;
    const FIELDS: &'static [KubeField] = &[KubeField::Name];
    const MAIN_FIELD: KubeField = KubeField::Name;

    fn uri(&self) -> &ResourceUri { &self.uri }
    fn field(&self, field: KubeField) -> &str {
        match field {
            KubeField::Name => &self.name,
        }
    }
    fn labels(&self) -> &[Label] { &self.labels }
}

// ---- Matches and search results ----

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceMatch<F> {
    pub field: F,
    pub search_term: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LabelMatchKind { LabelName, LabelValue }

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LabelMatch {
    pub kind: LabelMatchKind,
    pub label_name: String,
    pub search_term: String,
    pub score: u32,
}

/// A resource returned by a search together with what matched and its score.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "R: Serialize"))]
pub struct ResourceHit<R: SearchableResource> {
    pub resource: R,
    pub resource_matches: Vec<ResourceMatch<R::Field>>,
    pub label_matches: Vec<LabelMatch>,
    pub score: u32,
}

impl<R: SearchableResource> ResourceHit<R> {
    /// Unranked hit, as returned by an adapter before matches are populated.
    pub fn new(resource: R) -> Self {
        Self { resource, resource_matches: Vec::new(), label_matches: Vec::new(), score: 0 }
    }

    /// Search terms that matched the given field.
    pub fn field_keywords(&self, field: R::Field) -> Vec<&str> {
        self.resource_matches.iter().filter(|m| m.field == field).map(|m| m.search_term.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResourceSearchResult {
    Server(ResourceHit<Server>),
    Database(ResourceHit<Database>),
    Kube(ResourceHit<Kube>),
}

impl ResourceSearchResult {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSearchResult::Server(_) => ResourceKind::Server,
            ResourceSearchResult::Database(_) => ResourceKind::Database,
            ResourceSearchResult::Kube(_) => ResourceKind::Kube,
        }
    }

    pub fn uri(&self) -> &ResourceUri {
        match self {
            ResourceSearchResult::Server(h) => h.resource.uri(),
            ResourceSearchResult::Database(h) => h.resource.uri(),
            ResourceSearchResult::Kube(h) => h.resource.uri(),
        }
    }

    pub fn cluster_uri(&self) -> ClusterUri { self.uri().cluster_uri() }

    pub fn main_name(&self) -> &str {
        match self {
            ResourceSearchResult::Server(h) => h.resource.main_name(),
            ResourceSearchResult::Database(h) => h.resource.main_name(),
            ResourceSearchResult::Kube(h) => h.resource.main_name(),
        }
    }

    pub fn labels(&self) -> &[Label] {
        match self {
            ResourceSearchResult::Server(h) => h.resource.labels(),
            ResourceSearchResult::Database(h) => h.resource.labels(),
            ResourceSearchResult::Kube(h) => h.resource.labels(),
        }
    }

    pub fn label_matches(&self) -> &[LabelMatch] {
        match self {
            ResourceSearchResult::Server(h) => &h.label_matches,
            ResourceSearchResult::Database(h) => &h.label_matches,
            ResourceSearchResult::Kube(h) => &h.label_matches,
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            ResourceSearchResult::Server(h) => h.score,
            ResourceSearchResult::Database(h) => h.score,
            ResourceSearchResult::Kube(h) => h.score,
        }
    }
}

impl From<Server> for ResourceSearchResult {
    fn from(v: Server) -> Self { ResourceSearchResult::Server(ResourceHit::new(v)) }
}

impl From<Database> for ResourceSearchResult {
    fn from(v: Database) -> Self { ResourceSearchResult::Database(ResourceHit::new(v)) }
}

impl From<Kube> for ResourceSearchResult {
    fn from(v: Kube) -> Self { ResourceSearchResult::Kube(ResourceHit::new(v)) }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClusterFilterResult {
    pub resource: Cluster,
    pub name_match: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceTypeFilterResult {
    pub resource: ResourceKind,
    pub name_match: String,
    pub score: u32,
}

/// Everything the action picker can list.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SearchResult {
    Server(ResourceHit<Server>),
    Database(ResourceHit<Database>),
    Kube(ResourceHit<Kube>),
    ClusterFilter(ClusterFilterResult),
    ResourceTypeFilter(ResourceTypeFilterResult),
}

impl SearchResult {
    /// Stable key for list rendering.
    pub fn key(&self) -> String {
        match self {
            SearchResult::Server(h) => h.resource.uri.to_string(),
            SearchResult::Database(h) => h.resource.uri.to_string(),
            SearchResult::Kube(h) => h.resource.uri.to_string(),
            SearchResult::ClusterFilter(c) => c.resource.uri.to_string(),
            SearchResult::ResourceTypeFilter(r) => r.resource.plural().to_string(),
        }
    }
}

impl From<ResourceSearchResult> for SearchResult {
    fn from(v: ResourceSearchResult) -> Self {
        match v {
            ResourceSearchResult::Server(h) => SearchResult::Server(h),
            ResourceSearchResult::Database(h) => SearchResult::Database(h),
            ResourceSearchResult::Kube(h) => SearchResult::Kube(h),
        }
    }
}

// ---- Filters ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    ResourceType(ResourceKind),
    Cluster(ClusterUri),
}

impl Filter {
    fn same_kind(&self, other: &Filter) -> bool {
        matches!((self, other), (Filter::ResourceType(_), Filter::ResourceType(_)) | (Filter::Cluster(_), Filter::Cluster(_)))
    }
}

/// Active filters: at most one resource-type filter and one cluster filter,
/// in the order they were applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSet(SmallVec<[Filter; 2]>);

impl FilterSet {
    pub fn new() -> Self { Self::default() }

    /// New set with `filter` applied. A filter of the same kind is replaced in place.
    pub fn apply(&self, filter: Filter) -> Self {
        let mut out = self.clone();
        match out.0.iter_mut().find(|f| f.same_kind(&filter)) {
            Some(slot) => *slot = filter,
            None => out.0.push(filter),
        }
        out
    }

    pub fn remove(&self, filter: &Filter) -> Self { Self(self.0.iter().filter(|f| *f != filter).cloned().collect()) }

    /// Remove the most recently applied filter (backspace on empty input).
    pub fn pop_last(&self) -> (Self, Option<Filter>) {
        let mut out = self.clone();
        let popped = out.0.pop();
        (out, popped)
    }

    pub fn resource_type(&self) -> Option<ResourceKind> {
        self.0.iter().find_map(|f| match f {
            Filter::ResourceType(k) => Some(*k),
            Filter::Cluster(_) => None,
        })
    }

    pub fn cluster(&self) -> Option<&ClusterUri> {
        self.0.iter().find_map(|f| match f {
            Filter::Cluster(c) => Some(c),
            Filter::ResourceType(_) => None,
        })
    }

    pub fn contains(&self, filter: &Filter) -> bool { self.0.contains(filter) }
    pub fn iter(&self) -> impl Iterator<Item = &Filter> { self.0.iter() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        iter.into_iter().fold(FilterSet::new(), |set, f| set.apply(f))
    }
}

// ---- Errors ----

/// Why a cluster's resource search failed.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SearchCause {
    #[error("expired credentials: {0}")]
    ExpiredCredentials(String),
    #[error("no active session")]
    NoSession,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SearchCause {
    /// Resolvable by logging in again; such clusters are excluded from the search
    /// instead of reported as failed.
    pub fn is_retryable(&self) -> bool { matches!(self, SearchCause::ExpiredCredentials(_) | SearchCause::NoSession) }
}

/// A failed resource search on one cluster.
#[derive(Debug, Clone, thiserror::Error, Serialize, PartialEq, Eq)]
#[error("error while fetching {resource_kind} from cluster {cluster_uri}")]
pub struct ResourceSearchError {
    pub cluster_uri: ClusterUri,
    pub resource_kind: ResourceKind,
    #[source]
    pub cause: SearchCause,
}

impl ResourceSearchError {
    pub fn new(cluster_uri: ClusterUri, resource_kind: ResourceKind, cause: SearchCause) -> Self {
        Self { cluster_uri, resource_kind, cause }
    }

    pub fn is_retryable(&self) -> bool { self.cause.is_retryable() }

    /// e.g. "Could not fetch servers from teleport-local".
    pub fn message_with_cluster_name(&self, cluster_name: impl Fn(&ClusterUri) -> String, capitalize: bool) -> String {
        let verb = if capitalize { "Could" } else { "could" };
        format!("{} not fetch {} from {}", verb, self.resource_kind.plural(), cluster_name(&self.cluster_uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(name: &str) -> ClusterUri { ClusterUri::root(name) }

    #[test]
    fn filter_apply_is_idempotent_and_replaces_same_kind() {
        let set = FilterSet::new().apply(Filter::Cluster(cluster("a")));
        let twice = set.apply(Filter::Cluster(cluster("a")));
        assert_eq!(set, twice);
        assert_eq!(twice.len(), 1);

        let replaced = twice.apply(Filter::Cluster(cluster("b")));
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced.cluster(), Some(&cluster("b")));

        let both = replaced.apply(Filter::ResourceType(ResourceKind::Database));
        assert_eq!(both.len(), 2);
        assert_eq!(both.resource_type(), Some(ResourceKind::Database));
    }

    #[test]
    fn filter_remove_and_pop() {
        let set: FilterSet = vec![Filter::ResourceType(ResourceKind::Kube), Filter::Cluster(cluster("a"))].into_iter().collect();
        let removed = set.remove(&Filter::ResourceType(ResourceKind::Kube));
        assert_eq!(removed.iter().collect::<Vec<_>>(), vec![&Filter::Cluster(cluster("a"))]);
        // removing something absent is a no-op
        assert_eq!(removed.remove(&Filter::ResourceType(ResourceKind::Server)), removed);

        let (rest, popped) = set.pop_last();
        assert_eq!(popped, Some(Filter::Cluster(cluster("a"))));
        assert_eq!(rest.len(), 1);
        let (empty, _) = rest.pop_last();
        assert_eq!(empty.pop_last(), (FilterSet::new(), None));
    }

    #[test]
    fn retryable_causes() {
        assert!(SearchCause::ExpiredCredentials("cert expired".into()).is_retryable());
        assert!(SearchCause::NoSession.is_retryable());
        assert!(!SearchCause::Timeout(500).is_retryable());
        assert!(!SearchCause::AccessDenied("nope".into()).is_retryable());
    }

    #[test]
    fn error_message_uses_resolver() {
        let err = ResourceSearchError::new(cluster("teleport-local"), ResourceKind::Database, SearchCause::Internal("x".into()));
        let name = |u: &ClusterUri| u.name().to_uppercase();
        assert_eq!(err.message_with_cluster_name(name, true), "Could not fetch databases from TELEPORT-LOCAL");
        assert_eq!(err.message_with_cluster_name(name, false), "could not fetch databases from TELEPORT-LOCAL");
        assert_eq!(err.to_string(), "error while fetching databases from cluster /clusters/teleport-local");
    }

    #[test]
    fn resource_kind_parses_aliases() {
        assert_eq!("Databases".parse::<ResourceKind>().unwrap(), ResourceKind::Database);
        assert_eq!("kubernetes".parse::<ResourceKind>().unwrap(), ResourceKind::Kube);
        assert!("apps".parse::<ResourceKind>().is_err());
    }

    fn field_values<R: SearchableResource>(r: &R) -> Vec<(R::Field, &str)> {
        R::FIELDS.iter().map(|f| (*f, r.field(*f))).collect()
    }

    #[test]
    fn fields_enumerate_in_declared_order() {
        let uri = cluster("a").resource(ResourceKind::Server, "uuid-1");
        let server = Server {
            uri,
            name: "uuid-1".into(),
            hostname: "web-1".into(),
            addr: "10.0.0.1:3022".into(),
            tunnel: false,
            labels: Labels::new(),
        };
        assert_eq!(
            field_values(&server),
            vec![(ServerField::Name, "uuid-1"), (ServerField::Hostname, "web-1"), (ServerField::Addr, "10.0.0.1:3022")]
        );
        assert_eq!(server.main_name(), "web-1");
    }

    #[test]
    fn fixtures_deserialize_with_defaults() {
        let c: Cluster = serde_json::from_str(r#"{"uri":"/clusters/a","name":"a"}"#).unwrap();
        assert!(c.connected);
        let db: Database = serde_json::from_value(serde_json::json!({
            "uri": "/clusters/a/dbs/pg",
            "name": "pg",
            "protocol": "postgres",
            "type": "self-hosted",
            "labels": [{"name": "env", "value": "prod"}],
        }))
        .unwrap();
        assert_eq!(db.db_type, "self-hosted");
        assert_eq!(db.labels.len(), 1);
        assert_eq!(db.uri.cluster_uri(), c.uri);
    }
}
