// SPDX-License-Identifier: Apache-2.0
//! Config key to snapshot value resolution.
//!
//! Strategies run in a fixed order and the first non-null hit wins:
//! explicit key map, exact dotted path, case-insensitive path, normalized
//! path, alias candidates, then a depth-limited normalized-key search.

use std::collections::BTreeMap;

use confaudit_core::normalize_key;
use confaudit_model::{NodeId, NodeRef, ResolvedVia};
use tracing::debug;

use crate::aliases::AliasTable;
use crate::traverse::deep_find_by_normalized_key;

/// Explicit config-key to snapshot-path overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    entries: BTreeMap<String, String>,
}

impl KeyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.entries.insert(key.into(), path.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub value: Option<NodeRef<'a>>,
    pub via: ResolvedVia,
    /// Snapshot key or path that produced `value` when it differs from the
    /// config key.
    pub matched_key: Option<&'a str>,
}

impl<'a> Resolution<'a> {
    const fn unresolved() -> Self {
        Self {
            value: None,
            via: ResolvedVia::Unresolved,
            matched_key: None,
        }
    }

    const fn found(value: NodeRef<'a>, via: ResolvedVia, matched_key: Option<&'a str>) -> Self {
        Self {
            value: Some(value),
            via,
            matched_key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Leniency {
    Exact,
    CaseInsensitive,
    Normalized,
}

impl Leniency {
    const ALL: [Leniency; 3] = [Self::Exact, Self::CaseInsensitive, Self::Normalized];

    const fn via(self) -> ResolvedVia {
        match self {
            Self::Exact => ResolvedVia::Path,
            Self::CaseInsensitive => ResolvedVia::CaseInsensitive,
            Self::Normalized => ResolvedVia::Normalized,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyResolver<'e> {
    aliases: &'e AliasTable,
    key_map: Option<&'e KeyMap>,
    max_depth: usize,
}

impl<'e> KeyResolver<'e> {
    #[must_use]
    pub fn new(aliases: &'e AliasTable, key_map: Option<&'e KeyMap>, max_depth: usize) -> Self {
        Self {
            aliases,
            key_map,
            max_depth,
        }
    }

    /// Resolves `key` against `scope`. Never fails; an absent key yields
    /// [`ResolvedVia::Unresolved`].
    pub fn resolve<'a>(&self, scope: NodeRef<'a>, key: &str) -> Resolution<'a>
    where
        'e: 'a,
    {
        let resolution = self.resolve_inner(scope, key);
        debug!(
            key,
            via = resolution.via.as_str(),
            matched_key = resolution.matched_key.unwrap_or(""),
            "resolved config key"
        );
        resolution
    }

    fn resolve_inner<'a>(&self, scope: NodeRef<'a>, key: &str) -> Resolution<'a>
    where
        'e: 'a,
    {
        if key.is_empty() {
            return Resolution::unresolved();
        }

        if let Some(path) = self.key_map.and_then(|map| map.get(key)) {
            if let Some((value, _)) = lookup_path(scope, path) {
                return Resolution::found(value, ResolvedVia::KeyMap, Some(path));
            }
            if let Some((found, value)) =
                deep_find_by_normalized_key(scope, &normalize_key(path), self.max_depth)
            {
                return Resolution::found(value, ResolvedVia::KeyMap, Some(found));
            }
        }

        if let Some((value, via)) = lookup_path(scope, key) {
            return Resolution::found(value, via, None);
        }

        let normalized = normalize_key(key);
        for candidate in self.aliases.candidates(&normalized) {
            if let Some((value, _)) = lookup_path(scope, candidate) {
                return Resolution::found(value, ResolvedVia::Alias, Some(candidate.as_str()));
            }
        }

        if let Some((found, value)) =
            deep_find_by_normalized_key(scope, &normalized, self.max_depth)
        {
            return Resolution::found(value, ResolvedVia::DeepSearch, Some(found));
        }

        Resolution::unresolved()
    }

    /// Path walks, then a deep search for the last path segment. Used by the
    /// comparator to read corroborating fields such as `ui.theme`.
    pub fn locate<'a>(&self, scope: NodeRef<'a>, path: &str) -> Option<NodeRef<'a>> {
        if let Some((value, _)) = lookup_path(scope, path) {
            return Some(value);
        }
        let last = path.rsplit('.').next().unwrap_or(path);
        deep_find_by_normalized_key(scope, &normalize_key(last), self.max_depth)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// Exact, case-insensitive, then normalized walk of a dotted path.
pub fn lookup_path<'a>(scope: NodeRef<'a>, path: &str) -> Option<(NodeRef<'a>, ResolvedVia)> {
    if path.is_empty() {
        return None;
    }
    let segments: Vec<&str> = path.split('.').collect();
    Leniency::ALL.into_iter().find_map(|leniency| {
        let mut pending = Vec::new();
        walk(scope, &segments, leniency, &mut pending).map(|value| (value, leniency.via()))
    })
}

/// `pending` holds sequences entered without consuming a segment, so a
/// sequence nested in itself cannot recurse forever.
fn walk<'a>(
    node: NodeRef<'a>,
    segments: &[&str],
    leniency: Leniency,
    pending: &mut Vec<NodeId>,
) -> Option<NodeRef<'a>> {
    let Some((head, rest)) = segments.split_first() else {
        return (!node.is_null()).then_some(node);
    };

    if node.is_map() {
        let child = map_child(node, head, leniency)?;
        return walk(child, rest, leniency, &mut Vec::new());
    }

    if node.is_seq() {
        if let Ok(index) = head.trim().parse::<usize>() {
            return walk(node.index(index)?, rest, leniency, &mut Vec::new());
        }
        if pending.contains(&node.id()) {
            return None;
        }
        pending.push(node.id());
        let found = node
            .items()
            .find_map(|item| walk(item, segments, leniency, pending));
        pending.pop();
        return found;
    }

    None
}

fn map_child<'a>(node: NodeRef<'a>, segment: &str, leniency: Leniency) -> Option<NodeRef<'a>> {
    if let Some(child) = node.get(segment) {
        return Some(child);
    }
    if leniency >= Leniency::CaseInsensitive {
        let lowered = segment.to_lowercase();
        if let Some((_, child)) = node.entries().find(|(k, _)| k.to_lowercase() == lowered) {
            return Some(child);
        }
    }
    if leniency >= Leniency::Normalized {
        let normalized = normalize_key(segment);
        if !normalized.is_empty() {
            return node
                .entries()
                .find(|(k, _)| normalize_key(k) == normalized)
                .map(|(_, child)| child);
        }
    }
    None
}
