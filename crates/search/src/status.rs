//! Action picker status derived from the current attempt snapshots.
//!
//! Nothing here is stored: the status is recomputed whenever an attempt changes.

use std::collections::BTreeSet;

use serde::Serialize;
use tether_core::{Attempt, Cluster, ClusterUri, ResourceSearchError, SearchResult};

use crate::aggregate::CrossClusterResourceSearchResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ActionPickerStatus {
    NoInput {
        /// Every possible filter is already applied; the picker should not invite more filtering.
        has_no_remaining_filter_actions: bool,
    },
    Processing,
    Finished {
        has_no_results: bool,
        /// Shown to the user as itemized errors.
        non_retryable_resource_search_errors: Vec<ResourceSearchError>,
        /// Disconnected clusters plus clusters whose search failed for lack of a valid session.
        clusters_with_expired_certs: BTreeSet<ClusterUri>,
    },
}

/// Attempt snapshots the status is derived from.
pub struct StatusInput<'a> {
    pub input: &'a str,
    pub filter_actions: &'a Attempt<Vec<SearchResult>>,
    /// Filter actions first, then resource actions.
    pub action_attempts: &'a [&'a Attempt<Vec<SearchResult>>],
    pub resource_search: &'a Attempt<CrossClusterResourceSearchResult>,
    pub all_clusters: &'a [Cluster],
}

pub fn action_picker_status(s: StatusInput<'_>) -> ActionPickerStatus {
    if s.input.trim().is_empty() {
        // Filter actions are computed synchronously, so this attempt is always settled here.
        let has_no_remaining_filter_actions = matches!(s.filter_actions, Attempt::Success(actions) if actions.is_empty());
        return ActionPickerStatus::NoInput { has_no_remaining_filter_actions };
    }

    let all_finished = s.action_attempts.iter().all(|a| a.has_finished()) && s.resource_search.has_finished();
    if !all_finished {
        return ActionPickerStatus::Processing;
    }

    let has_no_results = s.action_attempts.iter().all(|a| a.data().map_or(true, |d| d.is_empty()));
    let mut clusters_with_expired_certs: BTreeSet<ClusterUri> =
        s.all_clusters.iter().filter(|c| !c.connected).map(|c| c.uri.clone()).collect();
    let mut non_retryable_resource_search_errors = Vec::new();
    if let Attempt::Success(result) = s.resource_search {
        for err in &result.errors {
            if err.is_retryable() {
                clusters_with_expired_certs.insert(err.cluster_uri.clone());
            } else {
                non_retryable_resource_search_errors.push(err.clone());
            }
        }
    }

    ActionPickerStatus::Finished { has_no_results, non_retryable_resource_search_errors, clusters_with_expired_certs }
}
