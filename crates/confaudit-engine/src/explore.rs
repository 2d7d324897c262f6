// SPDX-License-Identifier: Apache-2.0
//! Helpers for authoring key maps: path suggestions and value search.

use confaudit_core::normalize_key;
use confaudit_model::{ExpectedConfig, Snapshot};
use serde::Serialize;
use serde_json::Value;

use crate::similarity::{round4, similarity_ratio};
use crate::traverse::{key_paths, leaves};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSuggestion {
    pub key: String,
    pub path: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueMatch {
    pub path: String,
    pub value: Value,
    pub similarity: f64,
}

/// Dotted paths of every key and list index, containers included, e.g.
/// `net_if_addrs`, `net_if_addrs.eth0[1]` and `net_if_addrs.eth0[1].address`.
#[must_use]
pub fn flatten_snapshot_paths(snapshot: &Snapshot) -> Vec<String> {
    key_paths(snapshot)
}

/// Best-scoring path for each config key, if it reaches `threshold`. Ties
/// keep the first path in document order, so a container beats its children
/// on equal scores.
#[must_use]
pub fn suggest_mappings(
    config: &ExpectedConfig,
    snapshot: &Snapshot,
    threshold: f64,
) -> Vec<MappingSuggestion> {
    let paths: Vec<(String, String)> = flatten_snapshot_paths(snapshot)
        .into_iter()
        .map(|path| {
            let normalized = normalize_key(&path);
            (path, normalized)
        })
        .collect();

    config
        .keys()
        .filter_map(|key| {
            let wanted = normalize_key(key);
            let mut best: Option<(&str, f64)> = None;
            for (path, normalized) in &paths {
                let score = similarity_ratio(&wanted, normalized);
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((path.as_str(), score));
                }
            }
            best.filter(|(_, score)| *score >= threshold)
                .map(|(path, score)| MappingSuggestion {
                    key: key.to_string(),
                    path: path.to_string(),
                    similarity: round4(score),
                })
        })
        .collect()
}

/// Leaves whose text contains `query` or resembles it at or above
/// `min_similarity`, best first. Containment admits a leaf regardless of its
/// score; the reported similarity is always the real ratio.
#[must_use]
pub fn find_all_matches(snapshot: &Snapshot, query: &str, min_similarity: f64) -> Vec<ValueMatch> {
    let query = query.trim().to_lowercase();
    let mut matches: Vec<ValueMatch> = leaves(snapshot)
        .into_iter()
        .filter(|(_, node)| !node.is_null())
        .filter_map(|(path, node)| {
            let text = node.display_text().to_lowercase();
            let score = similarity_ratio(&query, &text);
            let contained = !query.is_empty() && text.contains(&query);
            (contained || score >= min_similarity).then(|| ValueMatch {
                path,
                value: node.to_json(),
                similarity: round4(score),
            })
        })
        .collect();
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches
}
