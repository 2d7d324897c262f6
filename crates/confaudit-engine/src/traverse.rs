// SPDX-License-Identifier: Apache-2.0
//! Bounded, cycle-safe walks over a snapshot.

use confaudit_core::{normalize_key, normalize_value_for_match};
use confaudit_model::{Node, NodeRef, Snapshot};

/// One bit per arena slot; a container is entered at most once per walk.
pub(crate) struct Visited {
    seen: Vec<bool>,
}

impl Visited {
    pub(crate) fn new(snapshot: &Snapshot) -> Self {
        Self {
            seen: vec![false; snapshot.node_count()],
        }
    }

    /// `false` when `node` is a container that was already entered.
    pub(crate) fn enter(&mut self, node: NodeRef<'_>) -> bool {
        if !node.is_container() {
            return true;
        }
        match self.seen.get_mut(node.id().index()) {
            Some(slot) if *slot => false,
            Some(slot) => {
                *slot = true;
                true
            }
            None => false,
        }
    }
}

/// First non-null value whose key normalizes to `target`, searching each map's
/// own keys before descending. `max_depth` bounds container nesting below
/// `root`.
pub(crate) fn deep_find_by_normalized_key<'a>(
    root: NodeRef<'a>,
    target: &str,
    max_depth: usize,
) -> Option<(&'a str, NodeRef<'a>)> {
    if target.is_empty() {
        return None;
    }
    let mut visited = Visited::new(root.snapshot());
    find_key(root, target, max_depth, &mut visited)
}

fn find_key<'a>(
    node: NodeRef<'a>,
    target: &str,
    depth_left: usize,
    visited: &mut Visited,
) -> Option<(&'a str, NodeRef<'a>)> {
    if !visited.enter(node) {
        return None;
    }
    if let Some(hit) = node
        .entries()
        .find(|(k, v)| !v.is_null() && normalize_key(k) == target)
    {
        return Some(hit);
    }
    if depth_left == 0 {
        return None;
    }
    node.children()
        .filter(|child| child.is_container())
        .find_map(|child| find_key(child, target, depth_left - 1, visited))
}

/// Whether any scalar within `max_depth` levels normalizes to a string that
/// contains `token`.
pub(crate) fn deep_value_contains(root: NodeRef<'_>, token: &str, max_depth: usize) -> bool {
    if token.is_empty() {
        return false;
    }
    let mut visited = Visited::new(root.snapshot());
    contains_value(root, token, max_depth, &mut visited)
}

fn contains_value(
    node: NodeRef<'_>,
    token: &str,
    depth_left: usize,
    visited: &mut Visited,
) -> bool {
    if !node.is_container() {
        return !node.is_null() && scalar_match_text(node).contains(token);
    }
    if !visited.enter(node) || depth_left == 0 {
        return false;
    }
    node.children()
        .any(|child| contains_value(child, token, depth_left - 1, visited))
}

fn scalar_match_text(node: NodeRef<'_>) -> String {
    match node.node() {
        Node::String(s) => normalize_key(s),
        _ => normalize_value_for_match(&node.to_json()),
    }
}

/// Every scalar leaf as `(path, value)`; paths look like `a.b[0].c`. Each
/// container is listed once, under the first path that reached it.
pub(crate) fn leaves(snapshot: &Snapshot) -> Vec<(String, NodeRef<'_>)> {
    let mut out = Vec::new();
    let mut visited = Visited::new(snapshot);
    collect_leaves(snapshot.root(), String::new(), &mut visited, &mut out);
    out
}

fn collect_leaves<'a>(
    node: NodeRef<'a>,
    path: String,
    visited: &mut Visited,
    out: &mut Vec<(String, NodeRef<'a>)>,
) {
    if !node.is_container() {
        out.push((path, node));
        return;
    }
    if !visited.enter(node) {
        return;
    }
    for (key, child) in node.entries() {
        let child_path = if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}.{key}")
        };
        collect_leaves(child, child_path, visited, out);
    }
    for (index, child) in node.items().enumerate() {
        collect_leaves(child, format!("{path}[{index}]"), visited, out);
    }
}

/// Every map key and list index as a path, containers included, in document
/// order. A container reached twice contributes its own path each time but
/// its children only once.
pub(crate) fn key_paths(snapshot: &Snapshot) -> Vec<String> {
    let mut out = Vec::new();
    let mut visited = Visited::new(snapshot);
    collect_key_paths(snapshot.root(), "", &mut visited, &mut out);
    out
}

fn collect_key_paths(
    node: NodeRef<'_>,
    path: &str,
    visited: &mut Visited,
    out: &mut Vec<String>,
) {
    if !node.is_container() || !visited.enter(node) {
        return;
    }
    for (key, child) in node.entries() {
        let child_path = if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}.{key}")
        };
        out.push(child_path.clone());
        collect_key_paths(child, &child_path, visited, out);
    }
    for (index, child) in node.items().enumerate() {
        let child_path = format!("{path}[{index}]");
        out.push(child_path.clone());
        collect_key_paths(child, &child_path, visited, out);
    }
}
