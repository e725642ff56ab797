//! Core error types for nodescape-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Two families
//! live here: [`CoreError`] for lookups against the graph data model, and
//! [`MetadataError`] for malformed node declarations caught when a node's
//! metadata is built.

use crate::id::{GroupId, NodeId};
use crate::metadata::SlotSide;
use thiserror::Error;

/// Lookup errors against the graph data model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A node id was not found in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A group id was not found.
    #[error("group not found: GroupId({id})", id = id.0)]
    GroupNotFound { id: GroupId },

    /// The node declares no variable-size slot on the requested side.
    #[error("node {node} has no variable-size {side} slot")]
    NoVariableSlot { node: NodeId, side: SlotSide },
}

/// Authoring-time errors in a node declaration.
///
/// These abort loading of the offending node kind only; the rest of the
/// graph is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The node declared no process entry point.
    #[error("node '{title}' declares no process operation")]
    MissingProcess { title: String },

    /// The node declared more than one process entry point.
    #[error("node '{title}' declares {count} process operations, expected exactly one")]
    DuplicateProcess { title: String, count: usize },

    /// An input slot was declared after an output slot.
    #[error("node '{title}': input '{name}' is declared after an output")]
    InputAfterOutput { title: String, name: String },

    /// More than one variable-size slot on the same side.
    #[error("node '{title}' declares more than one variable-size {side} slot")]
    MultipleVariableSlots { title: String, side: SlotSide },

    /// A variable-size slot is followed by another slot on its side.
    #[error("node '{title}': variable-size {side} slot '{name}' must be the last {side} slot")]
    VariableSlotNotLast {
        title: String,
        side: SlotSide,
        name: String,
    },

    /// A flow return value was declared on a node without flow outputs.
    #[error("node '{title}' returns a flow slot but declares no flow outputs")]
    UnexpectedReturn { title: String },

    /// A trigger node also declared a flow input.
    #[error("trigger node '{title}' cannot declare a flow input")]
    TriggerWithFlowInput { title: String },
}
