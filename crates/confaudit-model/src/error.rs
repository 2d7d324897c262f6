// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

use crate::snapshot::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    DuplicateKey(String),
    EmptyKey,
    UnknownNode(NodeId),
    NotAContainer {
        node: NodeId,
        expected: &'static str,
    },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "duplicate expected-config key `{key}`"),
            Self::EmptyKey => write!(f, "expected-config key must not be empty"),
            Self::UnknownNode(id) => write!(f, "snapshot node {} does not exist", id.index()),
            Self::NotAContainer { node, expected } => {
                write!(f, "snapshot node {} is not a {expected}", node.index())
            }
        }
    }
}

impl std::error::Error for ModelError {}
