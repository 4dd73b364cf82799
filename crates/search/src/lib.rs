//! Tether search: cross-cluster resource search, ranking and the action picker
//! model built on top of it.

#![forbid(unsafe_code)]

use std::time::Duration;

pub mod adapter;
pub mod aggregate;
pub mod filters;
pub mod highlight;
pub mod item;
pub mod notice;
pub mod rank;
pub mod session;
pub mod status;

pub use adapter::{ClusterNameResolver, ClusterRegistry, ResourceAdapter};
pub use aggregate::{CrossClusterResourceSearchResult, CrossClusterSearch};
pub use filters::filter_actions;
pub use highlight::{highlight, Span};
pub use item::{item_view, ItemView};
pub use notice::{notices, Notice};
pub use rank::{rank_results, sorted_labels, ScoreWeights};
pub use session::{spawn_picker, PickerEvent, PickerHandle, PickerSnapshot, SearchRequest, SearchSession};
pub use status::{action_picker_status, ActionPickerStatus, StatusInput};

/// Tunables of a search session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub weights: ScoreWeights,
    /// Cap on ranked resource results; `None` keeps all.
    pub limit: Option<usize>,
    /// Deadline for a single adapter call.
    pub call_timeout: Option<Duration>,
    /// Quiet period after the last keystroke before a search is issued.
    pub debounce: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { weights: ScoreWeights::default(), limit: None, call_timeout: None, debounce: Duration::from_millis(150) }
    }
}

impl SearchConfig {
    /// Defaults overridden by `TETHER_*` environment variables.
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Unparsable values are ignored.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(v: Option<String>) -> Option<T> { v.and_then(|s| s.trim().parse::<T>().ok()) }
        let d = Self::default();
        let w = d.weights;
        Self {
            weights: ScoreWeights {
                base: parsed(get("TETHER_SCORE_BASE")).unwrap_or(w.base),
                label: parsed(get("TETHER_SCORE_LABEL_WEIGHT")).unwrap_or(w.label),
                main_field: parsed(get("TETHER_SCORE_MAIN_FIELD_WEIGHT")).unwrap_or(w.main_field),
                other_field: parsed(get("TETHER_SCORE_FIELD_WEIGHT")).unwrap_or(w.other_field),
            },
            limit: parsed(get("TETHER_SEARCH_LIMIT")).or(d.limit),
            call_timeout: parsed(get("TETHER_SEARCH_TIMEOUT_MS")).map(Duration::from_millis).or(d.call_timeout),
            debounce: parsed(get("TETHER_DEBOUNCE_MS")).map_or(d.debounce, Duration::from_millis),
        }
    }
}
