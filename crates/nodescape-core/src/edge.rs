//! Connection types for the node graph.
//!
//! A [`NodeConnection`] is the weight of a directed petgraph edge from the
//! output node to the input node. Flow connections carry execution from a
//! flow output slot to a node's flow input; value connections carry a typed
//! value from an output slot to an input slot.

use serde::{Deserialize, Serialize};

use crate::types::ValueType;

/// Kind of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// Execution continues at the input node when the output node returns
    /// this connection's flow slot.
    Flow,
    /// Value dependency. `value_type` is the type shared by both ends once
    /// the connection has been type-checked.
    Value { value_type: ValueType },
}

/// A directed connection from `(output node, output_slot)` to
/// `(input node, input_slot)`.
///
/// Slots are virtual slot indices: a variable-size slot expands into as many
/// consecutive indices as the node instance currently has. Flow connections
/// always use `input_slot == 0` (a node has a single flow input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConnection {
    pub kind: ConnectionKind,
    pub output_slot: usize,
    pub input_slot: usize,
}

impl NodeConnection {
    pub fn flow(output_slot: usize) -> Self {
        NodeConnection {
            kind: ConnectionKind::Flow,
            output_slot,
            input_slot: 0,
        }
    }

    pub fn value(output_slot: usize, input_slot: usize, value_type: ValueType) -> Self {
        NodeConnection {
            kind: ConnectionKind::Value { value_type },
            output_slot,
            input_slot,
        }
    }

    /// Returns `true` if this is a flow connection.
    pub fn is_flow(&self) -> bool {
        matches!(self.kind, ConnectionKind::Flow)
    }

    /// Returns `true` if this is a value connection.
    pub fn is_value(&self) -> bool {
        matches!(self.kind, ConnectionKind::Value { .. })
    }

    /// Returns the value type carried by this connection, if it is a value
    /// connection.
    pub fn value_type(&self) -> Option<ValueType> {
        match self.kind {
            ConnectionKind::Value { value_type } => Some(value_type),
            ConnectionKind::Flow => None,
        }
    }
}
