//! Node shape metadata and its validating builder.
//!
//! A node kind declares its shape explicitly by driving a
//! [`NodeMetadataBuilder`]: flow input/outputs, trigger status, its process
//! entry point, and the ordered list of value slots (inputs first, then
//! outputs). [`NodeMetadataBuilder::build`] enforces the declaration rules and
//! yields an immutable [`NodeMetadata`].
//!
//! # Variable-size slots
//!
//! Each side may end with one variable-size slot. A node instance expands it
//! into `actual` consecutive *virtual* slots of the same type, so the virtual
//! count of a side is `declared - 1 + actual` when the side has a variable
//! slot and `declared` otherwise. Connections and memory always address
//! virtual slots.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;
use crate::types::ValueType;

/// Which side of a node a value slot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotSide {
    Input,
    Output,
}

impl fmt::Display for SlotSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotSide::Input => f.write_str("input"),
            SlotSide::Output => f.write_str("output"),
        }
    }
}

/// Whether the process operation completes synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessKind {
    Sync,
    Async,
}

/// A declared value slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub name: String,
    pub ty: ValueType,
    pub variable_size: bool,
}

/// Immutable shape of a node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub title: String,
    /// Type arguments of generic kinds (e.g. the source and target of a cast).
    pub generic_args: Vec<ValueType>,
    pub is_flow_input: bool,
    pub is_trigger: bool,
    pub is_async: bool,
    /// Whether the process operation selects the next flow slot. Flow-output
    /// nodes that do not return a slot always continue on flow slot 0.
    pub returns_flow: bool,
    pub flow_outputs: Vec<String>,
    pub inputs: Vec<SlotDescriptor>,
    pub outputs: Vec<SlotDescriptor>,
}

impl NodeMetadata {
    pub fn builder(title: impl Into<String>) -> NodeMetadataBuilder {
        NodeMetadataBuilder::new(title)
    }

    pub fn is_flow_output(&self) -> bool {
        !self.flow_outputs.is_empty()
    }

    /// Flow nodes take part in execution order; value nodes are pulled.
    pub fn is_flow(&self) -> bool {
        self.is_flow_input || self.is_flow_output() || self.is_trigger
    }

    pub fn is_value_input(&self) -> bool {
        !self.inputs.is_empty()
    }

    pub fn is_value_output(&self) -> bool {
        !self.outputs.is_empty()
    }

    pub fn has_variable_input(&self) -> bool {
        self.inputs.last().is_some_and(|s| s.variable_size)
    }

    pub fn has_variable_output(&self) -> bool {
        self.outputs.last().is_some_and(|s| s.variable_size)
    }

    /// Number of virtual input slots for a node whose variable input (if
    /// any) currently has `actual` entries.
    pub fn inputs_virtual_count(&self, actual: usize) -> usize {
        virtual_count(&self.inputs, actual)
    }

    /// Number of virtual output slots; see [`inputs_virtual_count`](Self::inputs_virtual_count).
    pub fn outputs_virtual_count(&self, actual: usize) -> usize {
        virtual_count(&self.outputs, actual)
    }

    /// Maps a virtual input slot to the index of its declared slot.
    pub fn input_slot_of(&self, virtual_slot: usize, actual: usize) -> Option<usize> {
        declared_slot_of(&self.inputs, virtual_slot, actual)
    }

    /// Maps a virtual output slot to the index of its declared slot.
    pub fn output_slot_of(&self, virtual_slot: usize, actual: usize) -> Option<usize> {
        declared_slot_of(&self.outputs, virtual_slot, actual)
    }

    pub fn input_type(&self, virtual_slot: usize, actual: usize) -> Option<ValueType> {
        self.input_slot_of(virtual_slot, actual)
            .map(|i| self.inputs[i].ty)
    }

    pub fn output_type(&self, virtual_slot: usize, actual: usize) -> Option<ValueType> {
        self.output_slot_of(virtual_slot, actual)
            .map(|i| self.outputs[i].ty)
    }

    /// Virtual slot range covered by the variable input, if declared.
    pub fn variable_input_range(&self, actual: usize) -> Option<Range<usize>> {
        self.has_variable_input().then(|| {
            let start = self.inputs.len() - 1;
            start..start + actual
        })
    }

    /// Virtual slot range covered by the variable output, if declared.
    pub fn variable_output_range(&self, actual: usize) -> Option<Range<usize>> {
        self.has_variable_output().then(|| {
            let start = self.outputs.len() - 1;
            start..start + actual
        })
    }
}

fn virtual_count(slots: &[SlotDescriptor], actual: usize) -> usize {
    match slots.last() {
        Some(last) if last.variable_size => slots.len() - 1 + actual,
        _ => slots.len(),
    }
}

fn declared_slot_of(slots: &[SlotDescriptor], virtual_slot: usize, actual: usize) -> Option<usize> {
    if virtual_slot >= virtual_count(slots, actual) {
        return None;
    }
    Some(virtual_slot.min(slots.len() - 1))
}

/// Collects a node's declarations and validates them into [`NodeMetadata`].
///
/// Declarations are recorded as written; all rule checks happen in
/// [`build`](Self::build) so a malformed declaration reports the first
/// violated rule rather than panicking mid-description.
#[derive(Debug, Clone)]
pub struct NodeMetadataBuilder {
    title: String,
    generic_args: Vec<ValueType>,
    flow_input: bool,
    trigger: bool,
    returns_flow: bool,
    flow_outputs: Vec<String>,
    processes: Vec<ProcessKind>,
    params: Vec<(SlotSide, SlotDescriptor)>,
}

impl NodeMetadataBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        NodeMetadataBuilder {
            title: title.into(),
            generic_args: Vec::new(),
            flow_input: false,
            trigger: false,
            returns_flow: false,
            flow_outputs: Vec::new(),
            processes: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn generic_arg(mut self, ty: ValueType) -> Self {
        self.generic_args.push(ty);
        self
    }

    pub fn flow_input(mut self) -> Self {
        self.flow_input = true;
        self
    }

    pub fn flow_outputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flow_outputs.extend(names.into_iter().map(Into::into));
        self
    }

    /// Marks the node as an entry point of every evaluation pass.
    pub fn trigger(mut self) -> Self {
        self.trigger = true;
        self
    }

    /// Declares the process entry point. Exactly one is required.
    pub fn process(mut self, kind: ProcessKind) -> Self {
        self.processes.push(kind);
        self
    }

    /// Declares that the process operation returns the flow slot to follow.
    pub fn returns_flow(mut self) -> Self {
        self.returns_flow = true;
        self
    }

    pub fn input(self, name: impl Into<String>, ty: ValueType) -> Self {
        self.param(SlotSide::Input, name, ty, false)
    }

    pub fn variable_input(self, name: impl Into<String>, ty: ValueType) -> Self {
        self.param(SlotSide::Input, name, ty, true)
    }

    pub fn output(self, name: impl Into<String>, ty: ValueType) -> Self {
        self.param(SlotSide::Output, name, ty, false)
    }

    pub fn variable_output(self, name: impl Into<String>, ty: ValueType) -> Self {
        self.param(SlotSide::Output, name, ty, true)
    }

    fn param(mut self, side: SlotSide, name: impl Into<String>, ty: ValueType, variable_size: bool) -> Self {
        self.params.push((
            side,
            SlotDescriptor {
                name: name.into(),
                ty,
                variable_size,
            },
        ));
        self
    }

    /// Validates the declarations and produces the node's metadata.
    pub fn build(self) -> Result<NodeMetadata, MetadataError> {
        let title = self.title;

        match self.processes.len() {
            0 => return Err(MetadataError::MissingProcess { title }),
            1 => {}
            count => return Err(MetadataError::DuplicateProcess { title, count }),
        }
        let is_async = self.processes[0] == ProcessKind::Async;

        // Outputs (by-reference parameters) must all follow the inputs.
        let mut seen_output = false;
        for (side, slot) in &self.params {
            match side {
                SlotSide::Output => seen_output = true,
                SlotSide::Input if seen_output => {
                    return Err(MetadataError::InputAfterOutput {
                        title,
                        name: slot.name.clone(),
                    })
                }
                SlotSide::Input => {}
            }
        }

        let (inputs, outputs): (Vec<_>, Vec<_>) = self
            .params
            .into_iter()
            .partition(|(side, _)| *side == SlotSide::Input);
        let inputs: Vec<SlotDescriptor> = inputs.into_iter().map(|(_, s)| s).collect();
        let outputs: Vec<SlotDescriptor> = outputs.into_iter().map(|(_, s)| s).collect();

        check_variable_slots(&title, SlotSide::Input, &inputs)?;
        check_variable_slots(&title, SlotSide::Output, &outputs)?;

        if self.returns_flow && self.flow_outputs.is_empty() {
            return Err(MetadataError::UnexpectedReturn { title });
        }
        if self.trigger && self.flow_input {
            return Err(MetadataError::TriggerWithFlowInput { title });
        }

        Ok(NodeMetadata {
            title,
            generic_args: self.generic_args,
            is_flow_input: self.flow_input,
            is_trigger: self.trigger,
            is_async,
            returns_flow: self.returns_flow,
            flow_outputs: self.flow_outputs,
            inputs,
            outputs,
        })
    }
}

fn check_variable_slots(title: &str, side: SlotSide, slots: &[SlotDescriptor]) -> Result<(), MetadataError> {
    let variable: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, s)| s.variable_size)
        .map(|(i, _)| i)
        .collect();

    if variable.len() > 1 {
        return Err(MetadataError::MultipleVariableSlots {
            title: title.to_string(),
            side,
        });
    }
    if let Some(&index) = variable.first() {
        if index != slots.len() - 1 {
            return Err(MetadataError::VariableSlotNotLast {
                title: title.to_string(),
                side,
                name: slots[index].name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn branch() -> NodeMetadata {
        NodeMetadata::builder("Branch")
            .flow_input()
            .flow_outputs(["True", "False"])
            .process(ProcessKind::Sync)
            .returns_flow()
            .input("Condition", ValueType::Bool)
            .build()
            .unwrap()
    }

    #[test]
    fn branch_shape_is_derived() {
        let meta = branch();
        assert!(meta.is_flow_input);
        assert!(meta.is_flow_output());
        assert!(meta.is_value_input());
        assert!(!meta.is_value_output());
        assert!(!meta.is_trigger);
        assert!(!meta.is_async);
        assert_eq!(meta.inputs_virtual_count(0), 1);
        assert_eq!(meta.input_type(0, 0), Some(ValueType::Bool));
        assert_eq!(meta.input_type(1, 0), None);
    }

    #[test]
    fn missing_process_is_rejected() {
        let err = NodeMetadata::builder("Empty").build().unwrap_err();
        assert!(matches!(err, MetadataError::MissingProcess { .. }));
    }

    #[test]
    fn duplicate_process_is_rejected() {
        let err = NodeMetadata::builder("Twice")
            .process(ProcessKind::Sync)
            .process(ProcessKind::Async)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MetadataError::DuplicateProcess {
                title: "Twice".into(),
                count: 2
            }
        );
    }

    #[test]
    fn input_after_output_is_rejected() {
        let err = NodeMetadata::builder("Misordered")
            .process(ProcessKind::Sync)
            .input("a", ValueType::Int)
            .output("out", ValueType::Int)
            .input("b", ValueType::Int)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MetadataError::InputAfterOutput {
                title: "Misordered".into(),
                name: "b".into()
            }
        );
    }

    #[test]
    fn variable_input_must_be_last() {
        let err = NodeMetadata::builder("Bad")
            .process(ProcessKind::Sync)
            .variable_input("items", ValueType::Int)
            .input("tail", ValueType::Int)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::VariableSlotNotLast {
                side: SlotSide::Input,
                ..
            }
        ));
    }

    #[test]
    fn two_variable_outputs_are_rejected() {
        let err = NodeMetadata::builder("Bad")
            .process(ProcessKind::Sync)
            .variable_output("a", ValueType::Int)
            .variable_output("b", ValueType::Int)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::MultipleVariableSlots {
                side: SlotSide::Output,
                ..
            }
        ));
    }

    #[test]
    fn variable_slots_on_both_sides_are_independent() {
        let meta = NodeMetadata::builder("Both")
            .process(ProcessKind::Sync)
            .input("sep", ValueType::Text)
            .variable_input("items", ValueType::Int)
            .variable_output("parts", ValueType::Text)
            .build()
            .unwrap();
        assert!(meta.has_variable_input());
        assert!(meta.has_variable_output());
        assert_eq!(meta.inputs_virtual_count(3), 4);
        assert_eq!(meta.outputs_virtual_count(2), 2);
        assert_eq!(meta.variable_input_range(3), Some(1..4));
        assert_eq!(meta.input_type(0, 3), Some(ValueType::Text));
        assert_eq!(meta.input_type(3, 3), Some(ValueType::Int));
        assert_eq!(meta.input_slot_of(2, 3), Some(1));
        assert_eq!(meta.input_type(4, 3), None);
    }

    #[test]
    fn return_without_flow_outputs_is_rejected() {
        let err = NodeMetadata::builder("Value")
            .process(ProcessKind::Sync)
            .returns_flow()
            .output("out", ValueType::Int)
            .build()
            .unwrap_err();
        assert!(matches!(err, MetadataError::UnexpectedReturn { .. }));
    }

    #[test]
    fn trigger_with_flow_input_is_rejected() {
        let err = NodeMetadata::builder("Trigger")
            .trigger()
            .flow_input()
            .flow_outputs(["Next"])
            .process(ProcessKind::Sync)
            .build()
            .unwrap_err();
        assert!(matches!(err, MetadataError::TriggerWithFlowInput { .. }));
    }

    #[test]
    fn async_process_is_recorded() {
        let meta = NodeMetadata::builder("Later")
            .flow_input()
            .process(ProcessKind::Async)
            .build()
            .unwrap();
        assert!(meta.is_async);
        assert!(meta.is_flow());
    }

    proptest! {
        #[test]
        fn virtual_input_count_matches_declaration(
            fixed in 0usize..6,
            variable in any::<bool>(),
            actual in 0usize..16,
        ) {
            let mut builder = NodeMetadata::builder("Generated").process(ProcessKind::Sync);
            for i in 0..fixed {
                builder = builder.input(format!("in{i}"), ValueType::Int);
            }
            if variable {
                builder = builder.variable_input("rest", ValueType::Int);
            }
            let meta = builder.build().unwrap();

            let expected = if variable {
                meta.inputs.len() - 1 + actual
            } else {
                meta.inputs.len()
            };
            prop_assert_eq!(meta.inputs_virtual_count(actual), expected);
            for slot in 0..expected {
                prop_assert!(meta.input_type(slot, actual).is_some());
            }
            prop_assert!(meta.input_type(expected, actual).is_none());
        }
    }
}
