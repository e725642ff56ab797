//! The node kind interface and the context a node processes in.
//!
//! A [`NodeKind`] states its shape once, through
//! [`NodeKind::describe`], and implements a single fixed-signature process
//! operation. The evaluator resolves the node's inputs, hands them over in a
//! [`ProcessContext`] together with an output buffer sized to the node's
//! virtual output count, and caches whatever the node wrote there.

use std::fmt;
use std::ops::Range;

use nodescape_core::id::NodeId;
use nodescape_core::metadata::{NodeMetadataBuilder, SlotSide};
use nodescape_core::types::Value;

use crate::error::ProcessError;
use crate::host::NodeHost;
use crate::scape::NodeScape;

static NULL: Value = Value::Null;

/// A kind of node: its declared shape plus its process operation.
pub trait NodeKind: fmt::Debug {
    /// Name of the concrete kind; the default metadata title.
    fn type_name(&self) -> &'static str;

    /// Key the graph caches this kind's metadata under. Generic kinds whose
    /// shape depends on instance data (e.g. a cast's source and target
    /// types) must return a key that includes that data.
    fn metadata_key(&self) -> String {
        self.type_name().to_string()
    }

    /// Declares the node's shape.
    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder;

    /// Number of virtual slots a new instance gives its variable-size slot
    /// on `side`. Only consulted when the side declares one.
    fn initial_variable_size(&self, _side: SlotSide) -> usize {
        1
    }

    /// Runs the node. Returns the flow output slot to continue on, for
    /// nodes that declare `returns_flow`; other nodes return `Ok(None)`.
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError>;
}

/// Everything a node sees while its process operation runs.
pub struct ProcessContext<'a> {
    pub(crate) scape: &'a mut NodeScape,
    pub(crate) node: NodeId,
    /// One value per declared input slot; the variable slot is packed.
    pub(crate) inputs: Vec<Value>,
    /// One value per virtual output slot.
    pub(crate) outputs: Vec<Value>,
    pub(crate) variable_outputs: Option<Range<usize>>,
    pub(crate) halted: bool,
}

impl<'a> ProcessContext<'a> {
    /// The node being processed.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Resolved value of a declared input slot, or `Null` past the end.
    pub fn input(&self, slot: usize) -> &Value {
        self.inputs.get(slot).unwrap_or(&NULL)
    }

    pub fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    /// The packed values of the variable-size input (the last declared
    /// input), or an empty slice if there is none.
    pub fn variable_input(&self) -> &[Value] {
        self.inputs
            .last()
            .and_then(Value::as_array)
            .unwrap_or(&[])
    }

    /// Number of virtual output slots.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Writes a virtual output slot. Out-of-range slots are ignored and
    /// reported by returning `false`.
    pub fn set_output(&mut self, slot: usize, value: Value) -> bool {
        match self.outputs.get_mut(slot) {
            Some(out) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Fills the variable-size output's virtual slots in order. Extra values
    /// are dropped; slots without a value keep their default.
    pub fn set_variable_outputs(&mut self, values: impl IntoIterator<Item = Value>) {
        let Some(range) = self.variable_outputs.clone() else {
            return;
        };
        for (slot, value) in range.zip(values) {
            self.outputs[slot] = value;
        }
    }

    /// Continues execution along one of this node's flow outputs and returns
    /// when that thread ends.
    ///
    /// The node's current outputs are written to memory first, so the
    /// downstream nodes can read them. With `should_scope`, everything
    /// computed downstream is discarded once the thread ends.
    pub fn trigger_flow(&mut self, slot: usize, should_scope: bool) {
        self.scape
            .memory
            .write(self.node, self.outputs.iter().cloned());
        self.scape.trigger_output_flow(self.node, slot, should_scope);
    }

    /// Stops this node's outgoing flow regardless of its return value.
    pub fn halt_flow(&mut self) {
        self.halted = true;
    }

    pub fn write_variable(&mut self, name: impl Into<String>, value: Value, persistent: bool) {
        self.scape.write_variable(name, value, persistent);
    }

    pub fn read_variable(&self, name: &str) -> Option<&Value> {
        self.scape.read_variable(name)
    }

    /// Emits a line of user-visible output for this pass.
    pub fn print(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(node = self.node.0, "{}", text);
        self.scape.pass.printed.push(text);
    }

    pub fn host(&self) -> &dyn NodeHost {
        self.scape.host()
    }
}
