//! Execution trace recording.
//!
//! When [`NodeScapeConfig::trace_enabled`](crate::NodeScapeConfig) is set,
//! every node evaluation in a pass appends a [`TraceEntry`] to the pass
//! report.

use nodescape_core::id::NodeId;
use nodescape_core::types::Value;
use serde::Serialize;

/// One node evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub node_id: NodeId,
    pub title: String,
    /// Memory scope depth the node ran at.
    pub scope: usize,
    /// Resolved inputs, one per declared input slot (variable slots packed).
    pub inputs: Vec<Value>,
    /// Values written to memory, one per virtual output slot.
    pub outputs: Vec<Value>,
    /// Flow slot the node continued on, if any.
    pub next_flow: Option<usize>,
}
