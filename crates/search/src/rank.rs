//! Match population and score-based ranking of resource search results.

use rustc_hash::FxHashMap;
use tether_core::{Label, LabelMatch, LabelMatchKind, ResourceHit, ResourceMatch, ResourceSearchResult, SearchableResource};

/// Weight table used to turn matches into scores.
///
/// A match scores `floor(term_len / matched_len * base * weight)`, so an exact
/// match (ratio 1) always outscores a substring match of the same field.
/// Lengths are taken after lowercasing, the same text the terms are matched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ScoreWeights {
    pub base: u32,
    pub label: u32,
    pub main_field: u32,
    pub other_field: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self { Self { base: 100, label: 1, main_field: 4, other_field: 2 } }
}

impl ScoreWeights {
    fn score(&self, term: &str, matched: &str, weight: u32) -> u32 {
        let matched_len = matched.chars().count() as u64;
        if matched_len == 0 {
            return 0;
        }
        let term_len = term.chars().count() as u64;
        let s = term_len * self.base as u64 * weight as u64 / matched_len;
        s.min(u32::MAX as u64) as u32
    }
}

/// Whitespace separated, lowercased, non-empty search terms.
pub fn search_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Recompute matches and score of a hit for the given terms.
pub fn populate_matches<R: SearchableResource>(hit: ResourceHit<R>, terms: &[String], w: &ScoreWeights) -> ResourceHit<R> {
    let resource = hit.resource;
    let mut label_matches = Vec::new();
    let mut resource_matches = Vec::new();
    let mut score: u32 = 0;
    for term in terms {
        for label in resource.labels() {
            let name = label.name.to_lowercase();
            if name.contains(term.as_str()) {
                let s = w.score(term, &name, w.label);
                score = score.saturating_add(s);
                label_matches.push(LabelMatch {
                    kind: LabelMatchKind::LabelName,
                    label_name: label.name.clone(),
                    search_term: term.clone(),
                    score: s,
                });
            }
            let value = label.value.to_lowercase();
            if value.contains(term.as_str()) {
                let s = w.score(term, &value, w.label);
                score = score.saturating_add(s);
                label_matches.push(LabelMatch {
                    kind: LabelMatchKind::LabelValue,
                    label_name: label.name.clone(),
                    search_term: term.clone(),
                    score: s,
                });
            }
        }
        for field in R::FIELDS {
            let value = resource.field(*field).to_lowercase();
            if value.contains(term.as_str()) {
                let weight = if *field == R::MAIN_FIELD { w.main_field } else { w.other_field };
                score = score.saturating_add(w.score(term, &value, weight));
                resource_matches.push(ResourceMatch { field: *field, search_term: term.clone() });
            }
        }
    }
    ResourceHit { resource, resource_matches, label_matches, score }
}

fn populate(result: ResourceSearchResult, terms: &[String], w: &ScoreWeights) -> ResourceSearchResult {
    match result {
        ResourceSearchResult::Server(h) => ResourceSearchResult::Server(populate_matches(h, terms, w)),
        ResourceSearchResult::Database(h) => ResourceSearchResult::Database(populate_matches(h, terms, w)),
        ResourceSearchResult::Kube(h) => ResourceSearchResult::Kube(populate_matches(h, terms, w)),
    }
}

/// Populate matches, then order by descending score, main name (case-insensitive,
/// then exact) and URI. The sort is stable so equal inputs keep their order.
pub fn rank_results(
    results: Vec<ResourceSearchResult>,
    query: &str,
    weights: &ScoreWeights,
    limit: Option<usize>,
) -> Vec<ResourceSearchResult> {
    let terms = search_terms(query);
    let mut ranked: Vec<ResourceSearchResult> = results.into_iter().map(|r| populate(r, &terms, weights)).collect();
    ranked.sort_by(|a, b| {
        b.score()
            .cmp(&a.score())
            .then_with(|| a.main_name().to_lowercase().cmp(&b.main_name().to_lowercase()))
            .then_with(|| a.main_name().cmp(b.main_name()))
            .then_with(|| a.uri().cmp(b.uri()))
    });
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

/// Labels of a result, highest summed label-match score first.
pub fn sorted_labels(result: &ResourceSearchResult) -> Vec<&Label> {
    sort_labels_by_score(result.labels(), result.label_matches())
}

pub fn sort_labels_by_score<'a>(labels: &'a [Label], matches: &[LabelMatch]) -> Vec<&'a Label> {
    let mut scores: FxHashMap<&str, u32> = FxHashMap::default();
    for m in matches {
        *scores.entry(m.label_name.as_str()).or_default() += m.score;
    }
    let mut sorted: Vec<&Label> = labels.iter().collect();
    sorted.sort_by(|a, b| {
        let sa = scores.get(a.name.as_str()).copied().unwrap_or(0);
        let sb = scores.get(b.name.as_str()).copied().unwrap_or(0);
        sb.cmp(&sa)
    });
    sorted
}
