use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tether_core::{Cluster, ClusterUri, Filter, Kube, ResourceKind, ResourceSearchResult, SearchCause, SearchResult};
use tether_search::{spawn_picker, ActionPickerStatus, ClusterRegistry, CrossClusterSearch, PickerEvent, ResourceAdapter, SearchConfig};

/// Kube adapter that records every query it receives.
#[derive(Default)]
struct Recording {
    calls: AtomicUsize,
    queries: std::sync::Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ResourceAdapter for Recording {
    fn kind(&self) -> ResourceKind { ResourceKind::Kube }

    async fn search(&self, cluster: &ClusterUri, query: &str) -> Result<Vec<ResourceSearchResult>, SearchCause> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut q) = self.queries.lock() {
            q.push(query.to_string());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(vec![Kube { uri: cluster.resource(ResourceKind::Kube, query), name: query.into(), labels: Default::default() }.into()])
    }
}

fn clusters() -> Vec<Cluster> { vec![Cluster { uri: ClusterUri::root("root"), name: "root".into(), connected: true }] }

async fn wait_finished(handle: &tether_search::PickerHandle) -> Arc<tether_search::PickerSnapshot> {
    let mut rx = handle.subscribe_generation();
    loop {
        let snap = handle.current();
        if matches!(snap.status, ActionPickerStatus::Finished { .. }) {
            return snap;
        }
        rx.changed().await.expect("picker loop alive");
    }
}

#[tokio::test(start_paused = true)]
async fn typing_is_debounced_into_a_single_search() {
    let adapter = Arc::new(Recording::default());
    let search = Arc::new(CrossClusterSearch::new(vec![adapter.clone() as Arc<dyn ResourceAdapter>], SearchConfig::default()));
    let registry: Arc<dyn ClusterRegistry> = Arc::new(clusters());
    let (tx, handle) = spawn_picker(search, registry, 16);

    for input in ["p", "pr", "pro", "prod"] {
        tx.send(PickerEvent::Input(input.into())).await.expect("send");
    }
    let snap = wait_finished(&handle).await;

    assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*adapter.queries.lock().expect("lock"), vec!["prod".to_string()]);
    assert_eq!(snap.input, "prod");
    let resource_names: Vec<&str> = snap
        .actions
        .iter()
        .filter_map(|a| match a {
            SearchResult::Kube(h) => Some(h.resource.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(resource_names, vec!["prod"]);
}

#[tokio::test(start_paused = true)]
async fn results_of_superseded_input_never_surface() {
    let adapter = Arc::new(Recording::default());
    let search = Arc::new(CrossClusterSearch::new(vec![adapter.clone() as Arc<dyn ResourceAdapter>], SearchConfig::default()));
    let registry: Arc<dyn ClusterRegistry> = Arc::new(clusters());
    let (tx, handle) = spawn_picker(search, registry, 16);

    tx.send(PickerEvent::Input("old".into())).await.expect("send");
    // Past the debounce so "old" is issued, but before its adapter call returns.
    tokio::time::sleep(Duration::from_millis(170)).await;
    tx.send(PickerEvent::Input("new".into())).await.expect("send");
    let snap = wait_finished(&handle).await;

    assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
    assert_eq!(snap.input, "new");
    assert!(snap.actions.iter().all(|a| !matches!(a, SearchResult::Kube(h) if h.resource.name == "old")));
    assert!(snap.actions.iter().any(|a| matches!(a, SearchResult::Kube(h) if h.resource.name == "new")));
}

#[tokio::test(start_paused = true)]
async fn filters_then_backspace() {
    let search = Arc::new(CrossClusterSearch::new(vec![Arc::new(Recording::default())], SearchConfig::default()));
    let registry: Arc<dyn ClusterRegistry> = Arc::new(clusters());
    let (tx, handle) = spawn_picker(search, registry, 16);
    let mut rx = handle.subscribe_generation();

    tx.send(PickerEvent::ApplyFilter(Filter::ResourceType(ResourceKind::Kube))).await.expect("send");
    tx.send(PickerEvent::ApplyFilter(Filter::Cluster(ClusterUri::root("root")))).await.expect("send");
    while handle.current().filters.len() < 2 {
        rx.changed().await.expect("picker loop alive");
    }
    assert_eq!(handle.current().status, ActionPickerStatus::NoInput { has_no_remaining_filter_actions: true });

    tx.send(PickerEvent::Backspace).await.expect("send");
    while handle.current().filters.len() != 1 {
        rx.changed().await.expect("picker loop alive");
    }
    let snap = handle.current();
    assert_eq!(snap.filters.resource_type(), Some(ResourceKind::Kube));
    assert_eq!(snap.status, ActionPickerStatus::NoInput { has_no_remaining_filter_actions: false });
}
