//! Cluster and resource URIs.
//!
//! Root clusters are addressed as `/clusters/<root>`, leaf clusters as
//! `/clusters/<root>/leaves/<leaf>`. Resources append `/<segment>/<name>` where
//! the segment is one of `servers`, `dbs` or `kubes`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ResourceKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("uri must start with /clusters/: {0}")]
    MissingClustersPrefix(String),
    #[error("uri has an empty segment: {0}")]
    EmptySegment(String),
    #[error("unknown resource segment {segment:?} in {uri}")]
    UnknownSegment { uri: String, segment: String },
    #[error("expected a cluster uri, got a resource uri: {0}")]
    NotACluster(String),
    #[error("expected a resource uri, got a cluster uri: {0}")]
    NotAResource(String),
}

#[derive(Debug)]
struct Parts<'a> {
    root: &'a str,
    leaf: Option<&'a str>,
    resource: Option<(ResourceKind, &'a str)>,
}

fn parse_parts(raw: &str) -> Result<Parts<'_>, UriError> {
    let rest = raw.strip_prefix("/clusters/").ok_or_else(|| UriError::MissingClustersPrefix(raw.to_string()))?;
    let segs: Vec<&str> = rest.split('/').collect();
    if segs.iter().any(|s| s.is_empty()) {
        return Err(UriError::EmptySegment(raw.to_string()));
    }
    let (root, tail) = segs.split_first().ok_or_else(|| UriError::EmptySegment(raw.to_string()))?;
    let (leaf, tail) = match tail {
        ["leaves", leaf, rest @ ..] => (Some(*leaf), rest),
        _ => (None, tail),
    };
    let resource = match tail {
        [] => None,
        [segment, name] => {
            let kind = ResourceKind::from_uri_segment(segment).ok_or_else(|| UriError::UnknownSegment {
                uri: raw.to_string(),
                segment: (*segment).to_string(),
            })?;
            Some((kind, *name))
        }
        [segment, ..] => {
            return Err(UriError::UnknownSegment { uri: raw.to_string(), segment: (*segment).to_string() })
        }
    };
    Ok(Parts { root, leaf, resource })
}

/// URI of a root or leaf cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterUri(String);

impl ClusterUri {
    pub fn root(name: &str) -> Self { Self(format!("/clusters/{}", name)) }

    pub fn leaf(&self, name: &str) -> Self { Self(format!("{}/leaves/{}", self.0, name)) }

    /// Name encoded in the URI: the leaf name for leaf clusters, the root name otherwise.
    pub fn name(&self) -> &str { self.0.rsplit('/').next().unwrap_or_default() }

    pub fn is_leaf(&self) -> bool { self.0.contains("/leaves/") }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn resource(&self, kind: ResourceKind, name: &str) -> ResourceUri {
        ResourceUri(format!("{}/{}/{}", self.0, kind.uri_segment(), name))
    }
}

impl FromStr for ClusterUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = parse_parts(s)?;
        if parts.resource.is_some() {
            return Err(UriError::NotACluster(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ClusterUri {
    type Error = UriError;
    fn try_from(v: String) -> Result<Self, Self::Error> { v.parse() }
}

impl From<ClusterUri> for String {
    fn from(v: ClusterUri) -> Self { v.0 }
}

impl fmt::Display for ClusterUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for ClusterUri {
    fn as_ref(&self) -> &str { &self.0 }
}

/// URI of a resource (server, database, kube) inside a cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceUri(String);

impl ResourceUri {
    /// Owning cluster; strips the trailing `/<segment>/<name>`.
    pub fn cluster_uri(&self) -> ClusterUri {
        let prefix = self.0.rsplitn(3, '/').nth(2).unwrap_or_default();
        ClusterUri(prefix.to_string())
    }

    pub fn name(&self) -> &str { self.0.rsplit('/').next().unwrap_or_default() }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl FromStr for ResourceUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = parse_parts(s)?;
        if parts.resource.is_none() {
            return Err(UriError::NotAResource(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ResourceUri {
    type Error = UriError;
    fn try_from(v: String) -> Result<Self, Self::Error> { v.parse() }
}

impl From<ResourceUri> for String {
    fn from(v: ResourceUri) -> Self { v.0 }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for ResourceUri {
    fn as_ref(&self) -> &str { &self.0 }
}

/// Cluster URI for either a cluster URI or a resource URI.
pub fn ensure_cluster_uri(uri: &str) -> Result<ClusterUri, UriError> {
    let parts = parse_parts(uri)?;
    let root = ClusterUri::root(parts.root);
    Ok(match parts.leaf { Some(leaf) => root.leaf(leaf), None => root })
}

/// Cluster name encoded in a cluster or resource URI (leaf name wins).
pub fn parse_cluster_name(uri: &str) -> Result<String, UriError> {
    let parts = parse_parts(uri)?;
    Ok(parts.leaf.unwrap_or(parts.root).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_uri_names() {
        let root: ClusterUri = "/clusters/teleport.example.com".parse().unwrap();
        assert_eq!(root.name(), "teleport.example.com");
        assert!(!root.is_leaf());
        let leaf = root.leaf("eu");
        assert_eq!(leaf.as_str(), "/clusters/teleport.example.com/leaves/eu");
        assert_eq!(leaf.name(), "eu");
        assert!(leaf.is_leaf());
    }

    #[test]
    fn resource_uri_resolves_owning_cluster() {
        let r: ResourceUri = "/clusters/root/leaves/eu/dbs/postgres".parse().unwrap();
        assert_eq!(r.cluster_uri().as_str(), "/clusters/root/leaves/eu");
        assert_eq!(r.name(), "postgres");
        let s = ClusterUri::root("root").resource(ResourceKind::Server, "abc");
        assert_eq!(s.as_str(), "/clusters/root/servers/abc");
        assert_eq!(s.cluster_uri(), ClusterUri::root("root"));
    }

    #[test]
    fn rejects_malformed_uris() {
        assert!(matches!("/foo/bar".parse::<ClusterUri>(), Err(UriError::MissingClustersPrefix(_))));
        assert!(matches!("/clusters/".parse::<ClusterUri>(), Err(UriError::EmptySegment(_))));
        assert!(matches!("/clusters/a/apps/x".parse::<ResourceUri>(), Err(UriError::UnknownSegment { .. })));
        assert!(matches!("/clusters/a/servers/x".parse::<ClusterUri>(), Err(UriError::NotACluster(_))));
        assert!(matches!("/clusters/a".parse::<ResourceUri>(), Err(UriError::NotAResource(_))));
    }

    #[test]
    fn routing_helpers_accept_both_uri_kinds() {
        assert_eq!(ensure_cluster_uri("/clusters/a/leaves/b/kubes/k").unwrap().as_str(), "/clusters/a/leaves/b");
        assert_eq!(ensure_cluster_uri("/clusters/a").unwrap().as_str(), "/clusters/a");
        assert_eq!(parse_cluster_name("/clusters/a/servers/x").unwrap(), "a");
        assert_eq!(parse_cluster_name("/clusters/a/leaves/b").unwrap(), "b");
    }

    #[test]
    fn serde_validates() {
        let ok: ClusterUri = serde_json::from_str("\"/clusters/a\"").unwrap();
        assert_eq!(ok.name(), "a");
        assert!(serde_json::from_str::<ClusterUri>("\"clusters/a\"").is_err());
    }
}
