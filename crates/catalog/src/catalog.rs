//! Catalog of resources a user can enroll, with per-kind access checks.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Application,
    Database,
    Desktop,
    Kubernetes,
    Server,
}

impl CatalogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogKind::Application => "application",
            CatalogKind::Database => "database",
            CatalogKind::Desktop => "desktop",
            CatalogKind::Kubernetes => "kubernetes",
            CatalogKind::Server => "server",
        }
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for CatalogKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "application" | "app" => Ok(CatalogKind::Application),
            "database" | "db" => Ok(CatalogKind::Database),
            "desktop" => Ok(CatalogKind::Desktop),
            "kubernetes" | "kube" => Ok(CatalogKind::Kubernetes),
            "server" | "node" => Ok(CatalogKind::Server),
            other => Err(format!("unknown resource kind: {}", other)),
        }
    }
}

/// Verbs granted on one resource type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Access {
    pub list: bool,
    pub read: bool,
    pub edit: bool,
    pub create: bool,
    pub remove: bool,
}

/// The subset of a user's access rules the catalog looks at. Missing entries deny.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Acl {
    pub tokens: Access,
    pub app_servers: Access,
    /// Database resources themselves; `create` gates manual registration.
    pub databases: Access,
    pub db_servers: Access,
    pub desktops: Access,
    pub kube_servers: Access,
    pub nodes: Access,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub kind: CatalogKind,
    pub name: String,
    /// Space separated, lowercase search keywords.
    pub keywords: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unguided_link: Option<String>,
    #[serde(default)]
    pub has_access: bool,
}

impl ResourceSpec {
    fn new(kind: CatalogKind, name: &str, keywords: &str) -> Self {
        Self { kind, name: name.to_string(), keywords: keywords.to_string(), unguided_link: None, has_access: false }
    }

    fn unguided(mut self, link: &str) -> Self {
        self.unguided_link = Some(link.to_string());
        self
    }
}

/// Enrolling anything requires creating a join token; each kind then needs
/// read and list on its own servers, except servers which only need list.
pub fn check_has_access(acl: &Acl, kind: CatalogKind) -> bool {
    if !acl.tokens.create {
        return false;
    }
    match kind {
        CatalogKind::Application => acl.app_servers.read && acl.app_servers.list,
        CatalogKind::Database => acl.db_servers.read && acl.db_servers.list,
        CatalogKind::Desktop => acl.desktops.read && acl.desktops.list,
        CatalogKind::Kubernetes => acl.kube_servers.read && acl.kube_servers.list,
        CatalogKind::Server => acl.nodes.list,
    }
}

/// Stamps `has_access` on every spec and moves accessible ones to the front,
/// keeping relative order within each group.
pub fn make_catalog(acl: &Acl, specs: &[ResourceSpec]) -> Vec<ResourceSpec> {
    let (mut allowed, denied): (Vec<_>, Vec<_>) = specs
        .iter()
        .cloned()
        .map(|mut s| {
            s.has_access = check_has_access(acl, s.kind);
            s
        })
        .partition(|s| s.has_access);
    debug!(allowed = allowed.len(), denied = denied.len(), "catalog built");
    allowed.extend(denied);
    allowed
}

/// Specs whose keywords contain every space separated term of `text`.
pub fn search_catalog<'a>(specs: &'a [ResourceSpec], text: &str) -> Vec<&'a ResourceSpec> {
    let terms: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    specs
        .iter()
        .filter(|s| {
            let keywords = s.keywords.to_lowercase();
            terms.iter().all(|t| keywords.contains(t.as_str()))
        })
        .collect()
}

/// Specs of `kind` first, everything else after, both in their original order.
pub fn sort_by_kind(kind: CatalogKind, specs: Vec<ResourceSpec>) -> Vec<ResourceSpec> {
    let (mut first, rest): (Vec<_>, Vec<_>) = specs.into_iter().partition(|s| s.kind == kind);
    first.extend(rest);
    first
}

/// Catalog narrowed to a kind the user arrived with, e.g. from an "add server" button.
pub fn preselect(kind: CatalogKind, specs: Vec<ResourceSpec>) -> Vec<ResourceSpec> {
    let sorted = sort_by_kind(kind, specs);
    search_catalog(&sorted, kind.as_str()).into_iter().cloned().collect()
}

pub fn builtin_specs() -> Vec<ResourceSpec> {
    use CatalogKind::*;
    vec![
        ResourceSpec::new(Server, "Ubuntu 14.04+", "server linux ubuntu debian"),
        ResourceSpec::new(Server, "Debian 8+", "server linux debian"),
        ResourceSpec::new(Server, "RHEL/CentOS 7+", "server linux rhel centos redhat"),
        ResourceSpec::new(Server, "Amazon Linux 2/2023", "server linux amazon ec2 aws"),
        ResourceSpec::new(Server, "macOS", "server mac macos apple"),
        ResourceSpec::new(Kubernetes, "Kubernetes", "kubernetes cluster kubes k8s eks gke aks"),
        ResourceSpec::new(Database, "RDS PostgreSQL", "database postgres postgresql rds aws amazon"),
        ResourceSpec::new(Database, "RDS MySQL/MariaDB", "database mysql mariadb rds aws amazon"),
        ResourceSpec::new(Database, "PostgreSQL", "database postgres postgresql self-hosted"),
        ResourceSpec::new(Database, "MongoDB", "database mongodb mongo self-hosted")
            .unguided("https://goteleport.com/docs/database-access/guides/mongodb-self-hosted/"),
        ResourceSpec::new(Desktop, "Active Directory users", "desktop windows microsoft active directory ad"),
        ResourceSpec::new(Desktop, "Local users", "desktop windows microsoft local"),
        ResourceSpec::new(Application, "Application", "application app web http"),
    ]
}
