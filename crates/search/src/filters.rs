//! "Search only in cluster X" / "Search only for resource type Y" actions.

use tether_core::{Cluster, ClusterFilterResult, FilterSet, ResourceKind, ResourceTypeFilterResult, SearchResult};

/// Filter actions selectable for the current input.
///
/// Resource-type actions come first and are offered only while no resource-type
/// filter is active; cluster actions follow, one per connected cluster, only
/// while no cluster filter is active. With non-empty input only candidates whose
/// name contains it (case-insensitive) are kept.
pub fn filter_actions(clusters: &[Cluster], filters: &FilterSet, input: &str) -> Vec<SearchResult> {
    let needle = input.trim().to_lowercase();
    let mut out = Vec::new();
    if filters.resource_type().is_none() {
        for kind in ResourceKind::ALL {
            if kind.plural().contains(needle.as_str()) {
                out.push(SearchResult::ResourceTypeFilter(ResourceTypeFilterResult {
                    resource: kind,
                    name_match: needle.clone(),
                    score: 0,
                }));
            }
        }
    }
    if filters.cluster().is_none() {
        for cluster in clusters.iter().filter(|c| c.connected) {
            if cluster.name.to_lowercase().contains(needle.as_str()) {
                out.push(SearchResult::ClusterFilter(ClusterFilterResult {
                    resource: cluster.clone(),
                    name_match: needle.clone(),
                    score: 0,
                }));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{ClusterUri, Filter};

    fn clusters() -> Vec<Cluster> {
        vec![
            Cluster { uri: ClusterUri::root("a"), name: "teleport-local".into(), connected: true },
            Cluster { uri: ClusterUri::root("b"), name: "staging".into(), connected: true },
            Cluster { uri: ClusterUri::root("c"), name: "expired".into(), connected: false },
        ]
    }

    fn keys(v: &[SearchResult]) -> Vec<String> { v.iter().map(|r| r.key()).collect() }

    #[test]
    fn no_filters_lists_every_kind_and_connected_cluster() {
        let actions = filter_actions(&clusters(), &FilterSet::new(), "");
        assert_eq!(keys(&actions), vec!["kubes", "servers", "databases", "/clusters/a", "/clusters/b"]);
    }

    #[test]
    fn active_filter_kind_removes_its_actions() {
        let with_type = FilterSet::new().apply(Filter::ResourceType(ResourceKind::Server));
        assert_eq!(keys(&filter_actions(&clusters(), &with_type, "")), vec!["/clusters/a", "/clusters/b"]);

        let both = with_type.apply(Filter::Cluster(ClusterUri::root("a")));
        assert!(filter_actions(&clusters(), &both, "").is_empty());
    }

    #[test]
    fn input_narrows_candidates() {
        assert_eq!(keys(&filter_actions(&clusters(), &FilterSet::new(), "Stag")), vec!["/clusters/b"]);
        assert_eq!(keys(&filter_actions(&clusters(), &FilterSet::new(), "ser")), vec!["servers"]);
        assert!(filter_actions(&clusters(), &FilterSet::new(), "zzz").is_empty());
    }
}
