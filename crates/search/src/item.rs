//! Display model of one action picker item: text fields paired with the search
//! terms to highlight in them.

use serde::Serialize;
use tether_core::{Database, DatabaseField, KubeField, LabelMatchKind, ResourceHit, SearchResult, SearchableResource, Server, ServerField};

use crate::adapter::ClusterNameResolver;
use crate::highlight::{highlight, Highlights};
use crate::rank::sort_labels_by_score;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub text: String,
    pub keywords: Vec<String>,
}

impl Field {
    fn plain(text: impl Into<String>) -> Self { Self { text: text.into(), keywords: Vec::new() } }

    fn new(text: &str, keywords: Vec<&str>) -> Self {
        Self { text: text.to_string(), keywords: keywords.into_iter().map(str::to_string).collect() }
    }

    pub fn spans(&self) -> Highlights<'_> { highlight(&self.text, &self.keywords) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelView {
    pub name: Field,
    pub value: Field,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    /// Action verb, e.g. "Connect over SSH to".
    pub action: &'static str,
    pub title: Field,
    /// Owning cluster; omitted when only one cluster exists.
    pub cluster_name: Option<String>,
    pub details: Vec<Field>,
    pub labels: Vec<LabelView>,
}

fn label_views<R: SearchableResource>(hit: &ResourceHit<R>) -> Vec<LabelView> {
    let matches = &hit.label_matches;
    sort_labels_by_score(hit.resource.labels(), matches)
        .into_iter()
        .map(|label| {
            let kws = |kind: LabelMatchKind| {
                matches
                    .iter()
                    .filter(|m| m.label_name == label.name && m.kind == kind)
                    .map(|m| m.search_term.as_str())
                    .collect::<Vec<_>>()
            };
            LabelView {
                name: Field::new(&label.name, kws(LabelMatchKind::LabelName)),
                value: Field::new(&label.value, kws(LabelMatchKind::LabelValue)),
            }
        })
        .collect()
}

fn server_view(hit: &ResourceHit<Server>) -> (Field, Vec<Field>) {
    let s = &hit.resource;
    let mut details = Vec::new();
    if s.tunnel {
        details.push(Field::plain("↵ tunnel"));
    } else {
        details.push(Field::new(&s.addr, hit.field_keywords(ServerField::Addr)));
    }
    let uuid_kws = hit.field_keywords(ServerField::Name);
    if !uuid_kws.is_empty() {
        details.push(Field::new(&s.name, uuid_kws));
    }
    (Field::new(&s.hostname, hit.field_keywords(ServerField::Hostname)), details)
}

fn database_view(hit: &ResourceHit<Database>) -> (Field, Vec<Field>) {
    let db = &hit.resource;
    let mut details = vec![
        Field::new(&db.db_type, hit.field_keywords(DatabaseField::Type)),
        Field::new(&db.protocol, hit.field_keywords(DatabaseField::Protocol)),
    ];
    if !db.desc.is_empty() {
        details.push(Field::new(&db.desc, hit.field_keywords(DatabaseField::Desc)));
    }
    (Field::new(&db.name, hit.field_keywords(DatabaseField::Name)), details)
}

/// Build the display model of a picker item.
pub fn item_view(result: &SearchResult, names: &ClusterNameResolver<'_>) -> ItemView {
    match result {
        SearchResult::Server(hit) => {
            let (title, details) = server_view(hit);
            ItemView {
                action: "Connect over SSH to",
                title,
                cluster_name: names.optional_cluster_name(hit.resource.uri.as_str()),
                details,
                labels: label_views(hit),
            }
        }
        SearchResult::Database(hit) => {
            let (title, details) = database_view(hit);
            ItemView {
                action: "Set up a db connection to",
                title,
                cluster_name: names.optional_cluster_name(hit.resource.uri.as_str()),
                details,
                labels: label_views(hit),
            }
        }
        SearchResult::Kube(hit) => {
            ItemView {
                action: "Log in to Kubernetes cluster",
                title: Field::new(&hit.resource.name, hit.field_keywords(KubeField::Name)),
                cluster_name: names.optional_cluster_name(hit.resource.uri.as_str()),
                details: Vec::new(),
                labels: label_views(hit),
            }
        }
        SearchResult::ClusterFilter(c) => ItemView {
            action: "Search only in",
            title: Field::new(&c.resource.name, vec![c.name_match.as_str()]),
            cluster_name: None,
            details: Vec::new(),
            labels: Vec::new(),
        },
        SearchResult::ResourceTypeFilter(r) => ItemView {
            action: "Search only for",
            title: Field::new(r.resource.plural(), vec![r.name_match.as_str()]),
            cluster_name: None,
            details: Vec::new(),
            labels: Vec::new(),
        },
    }
}
