//! User-facing copy for the non-interactive items shown above the result list.

use serde::Serialize;
use tether_core::{ClusterUri, ResourceSearchError};

use crate::status::ActionPickerStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "item", rename_all = "kebab-case")]
pub enum Notice {
    TypeToSearch,
    ResourceSearchErrors { title: String, summary: String, errors: Vec<ResourceSearchError> },
    NoResults { title: String, detail: Option<String> },
}

impl Notice {
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Notice::TypeToSearch => vec!["Type something to search."],
            Notice::ResourceSearchErrors { title, summary, .. } => vec![title.as_str(), summary.as_str()],
            Notice::NoResults { title, detail } => {
                let mut v = vec![title.as_str()];
                if let Some(d) = detail {
                    v.push(d.as_str());
                }
                v
            }
        }
    }
}

/// Explains why some clusters were left out; `None` when none were.
pub fn excluded_clusters_copy(mut names: Vec<String>) -> Option<String> {
    names.sort();
    match names.as_slice() {
        [] => None,
        [one] => Some(format!("The cluster {} was excluded from the search because you are not logged in to it.", one)),
        many => Some(format!(
            "The following clusters were excluded from the search because you are not logged in to them: {}.",
            many.join(", ")
        )),
    }
}

/// One-line description of non-retryable errors for the error item.
pub fn resource_search_errors_summary(errors: &[ResourceSearchError], cluster_name: &dyn Fn(&ClusterUri) -> String) -> String {
    match errors {
        [one] => format!("{}.", one.message_with_cluster_name(cluster_name, true)),
        many => {
            let all: Vec<String> = many.iter().map(|e| e.message_with_cluster_name(cluster_name, false)).collect();
            format!("Ran into {} errors: {}.", many.len(), all.join(", "))
        }
    }
}

/// Items to show above the results for a status, in display order.
pub fn notices(status: &ActionPickerStatus, cluster_name: &dyn Fn(&ClusterUri) -> String) -> Vec<Notice> {
    match status {
        ActionPickerStatus::NoInput { has_no_remaining_filter_actions } => {
            if *has_no_remaining_filter_actions {
                vec![Notice::TypeToSearch]
            } else {
                Vec::new()
            }
        }
        ActionPickerStatus::Processing => Vec::new(),
        ActionPickerStatus::Finished { has_no_results, non_retryable_resource_search_errors, clusters_with_expired_certs } => {
            let mut out = Vec::new();
            if !non_retryable_resource_search_errors.is_empty() {
                out.push(Notice::ResourceSearchErrors {
                    title: "Some of the search results are incomplete.".to_string(),
                    summary: resource_search_errors_summary(non_retryable_resource_search_errors, cluster_name),
                    errors: non_retryable_resource_search_errors.clone(),
                });
            }
            if *has_no_results {
                out.push(Notice::NoResults {
                    title: "No matching results found.".to_string(),
                    detail: excluded_clusters_copy(clusters_with_expired_certs.iter().map(cluster_name).collect()),
                });
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tether_core::{ResourceKind, SearchCause};

    fn name(uri: &ClusterUri) -> String { format!("{}-cluster", uri.name()) }

    fn err(cluster: &str, kind: ResourceKind) -> ResourceSearchError {
        ResourceSearchError::new(ClusterUri::root(cluster), kind, SearchCause::Internal("x".into()))
    }

    #[test]
    fn excluded_copy_singular_and_plural() {
        assert_eq!(excluded_clusters_copy(vec![]), None);
        assert_eq!(
            excluded_clusters_copy(vec!["b".into()]).as_deref(),
            Some("The cluster b was excluded from the search because you are not logged in to it.")
        );
        assert_eq!(
            excluded_clusters_copy(vec!["b".into(), "a".into()]).as_deref(),
            Some("The following clusters were excluded from the search because you are not logged in to them: a, b.")
        );
    }

    #[test]
    fn error_summary_singular_and_plural() {
        assert_eq!(resource_search_errors_summary(&[err("a", ResourceKind::Server)], &name), "Could not fetch servers from a-cluster.");
        assert_eq!(
            resource_search_errors_summary(&[err("a", ResourceKind::Server), err("b", ResourceKind::Kube)], &name),
            "Ran into 2 errors: could not fetch servers from a-cluster, could not fetch kubes from b-cluster."
        );
    }

    #[test]
    fn notices_follow_status() {
        assert_eq!(notices(&ActionPickerStatus::NoInput { has_no_remaining_filter_actions: true }, &name), vec![Notice::TypeToSearch]);
        assert!(notices(&ActionPickerStatus::NoInput { has_no_remaining_filter_actions: false }, &name).is_empty());
        assert!(notices(&ActionPickerStatus::Processing, &name).is_empty());

        let finished = ActionPickerStatus::Finished {
            has_no_results: true,
            non_retryable_resource_search_errors: vec![err("a", ResourceKind::Database)],
            clusters_with_expired_certs: BTreeSet::from([ClusterUri::root("z")]),
        };
        let out = notices(&finished, &name);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].lines(), vec!["Some of the search results are incomplete.", "Could not fetch databases from a-cluster."]);
        assert_eq!(
            out[1].lines(),
            vec!["No matching results found.", "The cluster z-cluster was excluded from the search because you are not logged in to it."]
        );
    }
}
