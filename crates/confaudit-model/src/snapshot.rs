// SPDX-License-Identifier: Apache-2.0
//! Snapshot trees stored as an index arena.
//!
//! Containers reference their children by [`NodeId`], so a collector that
//! grafts the same sub-result under two keys (or links a container back into
//! one of its ancestors) produces a shared or cyclic structure without any
//! reference counting. Every traversal in the engine tracks visited ids.

use std::fmt;

use confaudit_core::normalize_value_for_match;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::ModelError;

/// Emitted by [`NodeRef::to_json`] when a container is reached again through
/// its own descendants.
pub const CIRCULAR_MARKER: &str = "[circular]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Seq(Vec<NodeId>),
    Map(Vec<(String, NodeId)>),
}

impl Node {
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Seq(_) | Self::Map(_))
    }
}

/// Immutable measured-state tree produced by a collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Snapshot {
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let mut builder = SnapshotBuilder::new();
        let root = builder.import_json(value);
        Self {
            nodes: builder.nodes,
            root,
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            snapshot: self,
            id: self.root,
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.nodes.len()).then_some(NodeRef { snapshot: self, id })
    }

    /// Number of arena slots, used to size visited sets.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        self.root().to_json()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    nodes: Vec<Node>,
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        id
    }

    pub fn map(&mut self) -> NodeId {
        self.add(Node::Map(Vec::new()))
    }

    pub fn seq(&mut self) -> NodeId {
        self.add(Node::Seq(Vec::new()))
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.add(Node::String(value.into()))
    }

    /// Copies a JSON tree into the arena and returns its root id.
    pub fn import_json(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Null => self.add(Node::Null),
            Value::Bool(b) => self.add(Node::Bool(*b)),
            Value::Number(n) => self.add(Node::Number(n.clone())),
            Value::String(s) => self.add(Node::String(s.clone())),
            Value::Array(items) => {
                let children = items.iter().map(|item| self.import_json(item)).collect();
                self.add(Node::Seq(children))
            }
            Value::Object(map) => {
                let entries = map
                    .iter()
                    .map(|(k, v)| (k.clone(), self.import_json(v)))
                    .collect();
                self.add(Node::Map(entries))
            }
        }
    }

    /// Sets `key` on a map node, replacing an existing entry in place.
    pub fn insert(
        &mut self,
        map: NodeId,
        key: impl Into<String>,
        child: NodeId,
    ) -> Result<(), ModelError> {
        self.check(child)?;
        let key = key.into();
        match self.nodes.get_mut(map.index()) {
            Some(Node::Map(entries)) => {
                if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = child;
                } else {
                    entries.push((key, child));
                }
                Ok(())
            }
            Some(_) => Err(ModelError::NotAContainer {
                node: map,
                expected: "map",
            }),
            None => Err(ModelError::UnknownNode(map)),
        }
    }

    pub fn push(&mut self, seq: NodeId, child: NodeId) -> Result<(), ModelError> {
        self.check(child)?;
        match self.nodes.get_mut(seq.index()) {
            Some(Node::Seq(items)) => {
                items.push(child);
                Ok(())
            }
            Some(_) => Err(ModelError::NotAContainer {
                node: seq,
                expected: "sequence",
            }),
            None => Err(ModelError::UnknownNode(seq)),
        }
    }

    pub fn finish(self, root: NodeId) -> Result<Snapshot, ModelError> {
        self.check(root)?;
        Ok(Snapshot {
            nodes: self.nodes,
            root,
        })
    }

    fn check(&self, id: NodeId) -> Result<(), ModelError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownNode(id))
        }
    }
}

/// Borrowed handle to one node of a [`Snapshot`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    snapshot: &'a Snapshot,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub const fn id(self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn snapshot(self) -> &'a Snapshot {
        self.snapshot
    }

    #[must_use]
    pub fn node(self) -> &'a Node {
        &self.snapshot.nodes[self.id.index()]
    }

    fn at(self, id: NodeId) -> NodeRef<'a> {
        NodeRef {
            snapshot: self.snapshot,
            id,
        }
    }

    #[must_use]
    pub fn is_null(self) -> bool {
        matches!(self.node(), Node::Null)
    }

    #[must_use]
    pub fn is_map(self) -> bool {
        matches!(self.node(), Node::Map(_))
    }

    #[must_use]
    pub fn is_seq(self) -> bool {
        matches!(self.node(), Node::Seq(_))
    }

    #[must_use]
    pub fn is_container(self) -> bool {
        self.node().is_container()
    }

    #[must_use]
    pub fn as_str(self) -> Option<&'a str> {
        match self.node() {
            Node::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self.node() {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numbers, plus strings that parse as a number after trimming.
    #[must_use]
    pub fn as_f64(self) -> Option<f64> {
        match self.node() {
            Node::Number(n) => n.as_f64(),
            Node::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn entries(self) -> impl Iterator<Item = (&'a str, NodeRef<'a>)> + 'a {
        let entries: &'a [(String, NodeId)] = match self.node() {
            Node::Map(entries) => entries.as_slice(),
            _ => &[],
        };
        let snapshot = self.snapshot;
        entries
            .iter()
            .map(move |(k, id)| (k.as_str(), NodeRef { snapshot, id: *id }))
    }

    pub fn items(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let items: &'a [NodeId] = match self.node() {
            Node::Seq(items) => items.as_slice(),
            _ => &[],
        };
        let snapshot = self.snapshot;
        items.iter().map(move |id| NodeRef { snapshot, id: *id })
    }

    /// Children of either container kind, in document order.
    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.entries().map(|(_, v)| v).chain(self.items())
    }

    /// Exact, case-sensitive map lookup.
    #[must_use]
    pub fn get(self, key: &str) -> Option<NodeRef<'a>> {
        self.entries().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn index(self, index: usize) -> Option<NodeRef<'a>> {
        match self.node() {
            Node::Seq(items) => items.get(index).map(|id| self.at(*id)),
            _ => None,
        }
    }

    /// `true` for null, empty strings and empty containers.
    #[must_use]
    pub fn is_empty_value(self) -> bool {
        match self.node() {
            Node::Null => true,
            Node::String(s) => s.is_empty(),
            Node::Seq(items) => items.is_empty(),
            Node::Map(entries) => entries.is_empty(),
            Node::Bool(_) | Node::Number(_) => false,
        }
    }

    /// Scalars as plain text, containers as compact JSON.
    #[must_use]
    pub fn display_text(self) -> String {
        match self.node() {
            Node::Null => String::new(),
            Node::Bool(b) => b.to_string(),
            Node::Number(n) => n.to_string(),
            Node::String(s) => s.clone(),
            Node::Seq(_) | Node::Map(_) => self.to_json().to_string(),
        }
    }

    #[must_use]
    pub fn match_text(self) -> String {
        normalize_value_for_match(&self.to_json())
    }

    /// Materializes the subtree. Shared children are expanded at each
    /// occurrence; a container already on the current path becomes
    /// [`CIRCULAR_MARKER`].
    #[must_use]
    pub fn to_json(self) -> Value {
        let mut ancestors = Vec::new();
        self.to_json_inner(&mut ancestors)
    }

    fn to_json_inner(self, ancestors: &mut Vec<NodeId>) -> Value {
        let node = self.node();
        if node.is_container() {
            if ancestors.contains(&self.id) {
                return Value::String(CIRCULAR_MARKER.to_string());
            }
            ancestors.push(self.id);
        }
        let out = match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Seq(items) => Value::Array(
                items
                    .iter()
                    .map(|id| self.at(*id).to_json_inner(ancestors))
                    .collect(),
            ),
            Node::Map(entries) => {
                let mut map = Map::new();
                for (k, id) in entries {
                    map.insert(k.clone(), self.at(*id).to_json_inner(ancestors));
                }
                Value::Object(map)
            }
        };
        if node.is_container() {
            ancestors.pop();
        }
        out
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("node", self.node())
            .finish()
    }
}
