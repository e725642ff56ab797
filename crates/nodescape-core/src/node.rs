//! Placement and grouping records for graph elements.
//!
//! A node's identity is its [`NodeId`]; its placement on the editing surface
//! is a [`Position`] plus a z-order kept by the owning graph. Node shape
//! (slots and their types) is derived metadata, never stored here.
//! [`NodeGroup`] clusters nodes for the editor and has no evaluation
//! semantics.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::id::{GroupId, NodeId};

/// 2D position of a node on the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Position { x, y }
    }

    /// Point halfway between `self` and `other`.
    pub fn midpoint(self, other: Position) -> Position {
        Position {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// A named, ordered set of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub id: GroupId,
    pub title: String,
    nodes: IndexSet<NodeId>,
}

impl NodeGroup {
    pub fn new(id: GroupId, title: impl Into<String>) -> Self {
        NodeGroup {
            id,
            title: title.into(),
            nodes: IndexSet::new(),
        }
    }

    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Adds a node to the end of the group. Returns `false` if it was
    /// already a member.
    pub fn insert(&mut self, node: NodeId) -> bool {
        self.nodes.insert(node)
    }

    /// Removes a node, keeping the order of the remaining members.
    pub fn remove(&mut self, node: NodeId) -> bool {
        self.nodes.shift_remove(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Member nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
