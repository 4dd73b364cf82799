//! Search session: debounced input, committed filters and generation-tagged
//! resource searches, plus a background driver publishing picker snapshots.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tether_core::{Attempt, Cluster, Filter, FilterSet, ResourceSearchError, SearchResult};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::adapter::ClusterRegistry;
use crate::aggregate::{CrossClusterResourceSearchResult, CrossClusterSearch};
use crate::filters::filter_actions;
use crate::status::{action_picker_status, ActionPickerStatus, StatusInput};

/// A resource search the session wants issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: String,
    pub filters: FilterSet,
}

/// Input events accepted by [`spawn_picker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    Input(String),
    ApplyFilter(Filter),
    RemoveFilter(Filter),
    /// Backspace on an empty input drops the most recently applied filter.
    Backspace,
}

pub struct SearchSession {
    input: String,
    filters: FilterSet,
    generation: u64,
    changed_at: Option<Instant>,
    debounce: Duration,
    filter_actions: Attempt<Vec<SearchResult>>,
    resource_actions: Attempt<Vec<SearchResult>>,
    resource_search: Attempt<CrossClusterResourceSearchResult>,
}

impl SearchSession {
    pub fn new(debounce: Duration) -> Self {
        Self {
            input: String::new(),
            filters: FilterSet::new(),
            generation: 0,
            changed_at: None,
            debounce,
            filter_actions: Attempt::NotStarted,
            resource_actions: Attempt::NotStarted,
            resource_search: Attempt::NotStarted,
        }
    }

    pub fn input(&self) -> &str { &self.input }
    pub fn filters(&self) -> &FilterSet { &self.filters }
    pub fn generation(&self) -> u64 { self.generation }
    pub fn resource_search(&self) -> &Attempt<CrossClusterResourceSearchResult> { &self.resource_search }

    pub fn set_input(&mut self, input: impl Into<String>, clusters: &[Cluster], now: Instant) {
        self.input = input.into();
        self.invalidate(clusters, now);
    }

    /// Commits a filter and clears the input, as picking a filter action does.
    pub fn apply_filter(&mut self, filter: Filter, clusters: &[Cluster], now: Instant) {
        self.filters = self.filters.apply(filter);
        self.input.clear();
        self.invalidate(clusters, now);
    }

    pub fn remove_filter(&mut self, filter: &Filter, clusters: &[Cluster], now: Instant) {
        self.filters = self.filters.remove(filter);
        self.invalidate(clusters, now);
    }

    /// Returns the removed filter, if the input was empty and a filter was active.
    pub fn handle_backspace(&mut self, clusters: &[Cluster], now: Instant) -> Option<Filter> {
        if !self.input.is_empty() {
            return None;
        }
        let (rest, removed) = self.filters.pop_last();
        if removed.is_some() {
            self.filters = rest;
            self.invalidate(clusters, now);
        }
        removed
    }

    pub fn handle(&mut self, event: PickerEvent, clusters: &[Cluster], now: Instant) {
        match event {
            PickerEvent::Input(s) => self.set_input(s, clusters, now),
            PickerEvent::ApplyFilter(f) => self.apply_filter(f, clusters, now),
            PickerEvent::RemoveFilter(f) => self.remove_filter(&f, clusters, now),
            PickerEvent::Backspace => {
                self.handle_backspace(clusters, now);
            }
        }
    }

    // Every input or filter change starts a new generation; anything in flight
    // for an older one is discarded when it settles.
    fn invalidate(&mut self, clusters: &[Cluster], now: Instant) {
        self.generation += 1;
        self.filter_actions = Attempt::Success(filter_actions(clusters, &self.filters, &self.input));
        if self.input.trim().is_empty() {
            self.changed_at = None;
            self.resource_actions = Attempt::NotStarted;
            self.resource_search = Attempt::NotStarted;
        } else {
            self.changed_at = Some(now);
            self.resource_actions = Attempt::Processing;
            self.resource_search = Attempt::Processing;
        }
    }

    /// True once the input has been quiet for the debounce period.
    pub fn due(&self, now: Instant) -> bool {
        self.changed_at.map_or(false, |t0| now.saturating_duration_since(t0) >= self.debounce)
    }

    /// The request to issue now, if the debounce period has elapsed.
    pub fn begin(&mut self, now: Instant) -> Option<SearchRequest> {
        if !self.due(now) {
            return None;
        }
        self.flush()
    }

    /// The pending request regardless of debounce.
    pub fn flush(&mut self) -> Option<SearchRequest> {
        self.changed_at.take()?;
        Some(SearchRequest { generation: self.generation, query: self.input.clone(), filters: self.filters.clone() })
    }

    /// Stores the result of a finished request. Results of an older generation
    /// are dropped and `false` is returned.
    pub fn settle(&mut self, generation: u64, result: CrossClusterResourceSearchResult) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale search result");
            return false;
        }
        self.resource_actions = Attempt::Success(result.results.iter().cloned().map(SearchResult::from).collect());
        self.resource_search = Attempt::Success(result);
        true
    }

    /// Filter actions followed by resource actions, in display order.
    pub fn actions(&self) -> Vec<SearchResult> {
        let mut out = Vec::new();
        for a in [&self.filter_actions, &self.resource_actions] {
            if let Some(items) = a.data() {
                out.extend(items.iter().cloned());
            }
        }
        out
    }

    pub fn errors(&self) -> &[ResourceSearchError] {
        match self.resource_search.data() {
            Some(r) => &r.errors,
            None => &[],
        }
    }

    pub fn status(&self, clusters: &[Cluster]) -> ActionPickerStatus {
        action_picker_status(StatusInput {
            input: &self.input,
            filter_actions: &self.filter_actions,
            action_attempts: &[&self.filter_actions, &self.resource_actions],
            resource_search: &self.resource_search,
            all_clusters: clusters,
        })
    }

    /// Issues the pending request immediately and settles it.
    pub async fn run(&mut self, search: &CrossClusterSearch, registry: &dyn ClusterRegistry) -> bool {
        let Some(req) = self.flush() else { return false };
        let clusters = registry.clusters();
        let result = search.search(&clusters, &req.query, &req.filters).await;
        self.settle(req.generation, result)
    }
}

/// What a renderer reads: one consistent view of the picker.
#[derive(Debug, Clone)]
pub struct PickerSnapshot {
    pub generation: u64,
    pub input: String,
    pub filters: FilterSet,
    pub status: ActionPickerStatus,
    pub actions: Vec<SearchResult>,
    pub errors: Vec<ResourceSearchError>,
}

impl Default for PickerSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            input: String::new(),
            filters: FilterSet::new(),
            status: ActionPickerStatus::NoInput { has_no_remaining_filter_actions: false },
            actions: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl PickerSnapshot {
    fn of(session: &SearchSession, clusters: &[Cluster]) -> Self {
        Self {
            generation: session.generation(),
            input: session.input().to_string(),
            filters: session.filters().clone(),
            status: session.status(clusters),
            actions: session.actions(),
            errors: session.errors().to_vec(),
        }
    }
}

/// Read side of a running picker.
#[derive(Clone)]
pub struct PickerHandle {
    snap: Arc<ArcSwap<PickerSnapshot>>,
    generation_rx: watch::Receiver<u64>,
}

impl PickerHandle {
    pub fn current(&self) -> Arc<PickerSnapshot> { self.snap.load_full() }
    pub fn subscribe_generation(&self) -> watch::Receiver<u64> { self.generation_rx.clone() }
}

/// Spawn a picker loop consuming input events. Searches run as separate tasks
/// so typing never waits on a slow cluster; every state change is published.
pub fn spawn_picker(
    search: Arc<CrossClusterSearch>,
    registry: Arc<dyn ClusterRegistry>,
    cap: usize,
) -> (mpsc::Sender<PickerEvent>, PickerHandle) {
    let (tx, mut rx) = mpsc::channel::<PickerEvent>(cap);
    let snap = Arc::new(ArcSwap::from_pointee(PickerSnapshot::default()));
    let (generation_tx, generation_rx) = watch::channel(0u64);
    let snap_clone = Arc::clone(&snap);

    tokio::spawn(async move {
        let mut session = SearchSession::new(search.config().debounce);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u64, CrossClusterResourceSearchResult)>();
        let mut ticker = tokio::time::interval(Duration::from_millis(8));
        let publish = |session: &SearchSession, clusters: &[Cluster]| {
            snap_clone.store(Arc::new(PickerSnapshot::of(session, clusters)));
            // Sent even when unchanged so readers also wake on settled searches.
            generation_tx.send_replace(session.generation());
        };
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(ev) => {
                            let clusters = registry.clusters();
                            session.handle(ev, &clusters, Instant::now());
                            publish(&session, &clusters);
                        }
                        None => {
                            debug!("picker event channel closed; exiting picker loop");
                            break;
                        }
                    }
                }
                Some((generation, result)) = done_rx.recv() => {
                    if session.settle(generation, result) {
                        publish(&session, &registry.clusters());
                    }
                }
                _ = ticker.tick() => {
                    if let Some(req) = session.begin(Instant::now()) {
                        debug!(generation = req.generation, query = %req.query, "issuing search");
                        let search = Arc::clone(&search);
                        let clusters = registry.clusters();
                        let done_tx = done_tx.clone();
                        tokio::spawn(async move {
                            let result = search.search(&clusters, &req.query, &req.filters).await;
                            let _ = done_tx.send((req.generation, result));
                        });
                    }
                }
            }
        }
        info!("picker loop stopped");
    });

    (tx, PickerHandle { snap, generation_rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ResourceAdapter;
    use crate::SearchConfig;
    use tether_core::{ClusterUri, Kube, ResourceKind, ResourceSearchResult, SearchCause};

    struct OneKube;

    #[async_trait::async_trait]
    impl ResourceAdapter for OneKube {
        fn kind(&self) -> ResourceKind { ResourceKind::Kube }
        async fn search(&self, cluster: &ClusterUri, _query: &str) -> Result<Vec<ResourceSearchResult>, SearchCause> {
            Ok(vec![Kube { uri: cluster.resource(ResourceKind::Kube, "k8s"), name: "k8s".into(), labels: Default::default() }.into()])
        }
    }

    fn clusters() -> Vec<Cluster> {
        vec![
            Cluster { uri: ClusterUri::root("a"), name: "alpha".into(), connected: true },
            Cluster { uri: ClusterUri::root("b"), name: "beta".into(), connected: true },
        ]
    }

    #[test]
    fn debounce_delays_the_request() {
        let t0 = Instant::now();
        let mut s = SearchSession::new(Duration::from_millis(150));
        s.set_input("db", &clusters(), t0);
        assert_eq!(s.begin(t0 + Duration::from_millis(100)), None);
        let req = s.begin(t0 + Duration::from_millis(150)).expect("due after debounce");
        assert_eq!(req.query, "db");
        assert_eq!(req.generation, s.generation());
        assert_eq!(s.begin(t0 + Duration::from_secs(1)), None, "a request is issued once");
        assert_eq!(s.status(&clusters()), ActionPickerStatus::Processing);
    }

    #[test]
    fn stale_results_are_discarded() {
        let t0 = Instant::now();
        let mut s = SearchSession::new(Duration::ZERO);
        s.set_input("d", &clusters(), t0);
        let old = s.begin(t0).expect("request");
        s.set_input("db", &clusters(), t0);
        assert!(!s.settle(old.generation, CrossClusterResourceSearchResult::default()));
        assert!(s.resource_search().is_processing());

        let new = s.begin(t0).expect("request");
        assert!(s.settle(new.generation, CrossClusterResourceSearchResult { search: "db".into(), ..Default::default() }));
        assert!(matches!(s.status(&clusters()), ActionPickerStatus::Finished { has_no_results: true, .. }));
    }

    #[test]
    fn filter_changes_clear_input_and_bump_generation() {
        let t0 = Instant::now();
        let mut s = SearchSession::new(Duration::ZERO);
        s.set_input("bet", &clusters(), t0);
        let g = s.generation();
        s.apply_filter(Filter::Cluster(ClusterUri::root("b")), &clusters(), t0);
        assert!(s.generation() > g);
        assert_eq!(s.input(), "");
        assert_eq!(s.flush(), None, "no resource search without input");
        assert_eq!(s.status(&clusters()), ActionPickerStatus::NoInput { has_no_remaining_filter_actions: false });

        s.apply_filter(Filter::ResourceType(ResourceKind::Database), &clusters(), t0);
        assert_eq!(s.status(&clusters()), ActionPickerStatus::NoInput { has_no_remaining_filter_actions: true });

        assert_eq!(s.handle_backspace(&clusters(), t0), Some(Filter::ResourceType(ResourceKind::Database)));
        assert_eq!(s.filters().len(), 1);
        s.set_input("x", &clusters(), t0);
        assert_eq!(s.handle_backspace(&clusters(), t0), None, "backspace edits non-empty input");
    }

    #[tokio::test]
    async fn run_flushes_and_settles() {
        let search = CrossClusterSearch::new(vec![Arc::new(OneKube)], SearchConfig::default());
        let reg = clusters();
        let mut s = SearchSession::new(Duration::from_secs(60));
        s.set_input("k8s", &reg, Instant::now());
        assert!(s.run(&search, &reg).await, "run ignores the debounce");
        assert_eq!(s.actions().iter().filter(|a| matches!(a, SearchResult::Kube(_))).count(), 2);
        assert!(!s.run(&search, &reg).await, "nothing pending");
    }
}
