//! Graph evaluation.
//!
//! One [`NodeScape::update`] call is one evaluation pass: memory is reset,
//! then every trigger node runs, in ascending id order, until its flow
//! thread ends. Flow nodes are visited in the order their flow outputs
//! select; value nodes are pulled lazily, depth-first, the first time a
//! consumer needs one of their outputs, and memoized in
//! [`NodeScapeMemory`](nodescape_core::NodeScapeMemory) for the rest of the
//! pass (or until the scope they were computed in is popped).
//!
//! Nothing raised during a pass escapes `update()`. Problems are recorded as
//! [`EvaluationFault`]s in the returned [`UpdateReport`]; a fault ends the
//! flow thread it occurred on and leaves the other trigger roots unaffected.

use std::sync::Arc;

use serde::Serialize;

use nodescape_core::id::NodeId;
use nodescape_core::metadata::NodeMetadata;
use nodescape_core::types::{Value, ValueType};

use crate::error::EvaluationFault;
use crate::kind::{NodeKind, ProcessContext};
use crate::scape::NodeScape;
use crate::trace::TraceEntry;

/// Summary of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateReport {
    /// Trigger nodes that started a flow thread.
    pub triggers: usize,
    /// Process operations run, value pulls included.
    pub nodes_evaluated: usize,
    pub faults: Vec<EvaluationFault>,
    /// Lines emitted by print nodes, in order.
    pub printed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
}

impl UpdateReport {
    /// Returns `true` if the pass recorded no faults.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Bookkeeping of the pass in progress.
#[derive(Debug, Default)]
pub(crate) struct PassState {
    pub(crate) faults: Vec<EvaluationFault>,
    pub(crate) printed: Vec<String>,
    pub(crate) trace: Option<Vec<TraceEntry>>,
    pub(crate) nodes_evaluated: usize,
    /// Current nesting of node executions and nested flow threads.
    pub(crate) depth: usize,
}

impl PassState {
    pub(crate) fn new(trace_enabled: bool) -> Self {
        PassState {
            trace: trace_enabled.then(Vec::new),
            ..PassState::default()
        }
    }
}

impl NodeScape {
    /// Runs one evaluation pass over every trigger node.
    pub fn update(&mut self) -> UpdateReport {
        self.memory.reset();
        self.pass = PassState::new(self.config.trace_enabled);

        let triggers = self.trigger_nodes();
        tracing::debug!("evaluation pass: {} trigger(s)", triggers.len());
        for &trigger in &triggers {
            self.run_flow(trigger);
        }

        let pass = std::mem::take(&mut self.pass);
        UpdateReport {
            triggers: triggers.len(),
            nodes_evaluated: pass.nodes_evaluated,
            faults: pass.faults,
            printed: pass.printed,
            trace: pass.trace,
        }
    }

    /// Continues execution along the flow connection leaving `(source,
    /// flow_slot)` and returns once that thread ends. With `should_scope`,
    /// memory entries written downstream are discarded afterwards.
    ///
    /// Does nothing if the slot is not connected.
    pub fn trigger_output_flow(&mut self, source: NodeId, flow_slot: usize, should_scope: bool) {
        let Some(target) = self.flow_target(source, flow_slot) else {
            return;
        };
        let limit = self.config.max_recursion_depth;
        if self.pass.depth >= limit {
            self.record_fault(EvaluationFault::RecursionLimitExceeded { node: target, limit });
            return;
        }

        self.pass.depth += 1;
        if should_scope {
            self.memory.push();
        }
        self.run_flow(target);
        if should_scope {
            self.memory.pop();
        }
        self.pass.depth -= 1;
    }

    /// Executes flow nodes starting at `start` until no next node is
    /// selected, a fault occurs or the step limit is reached.
    fn run_flow(&mut self, start: NodeId) {
        let limit = self.config.max_flow_steps;
        let mut current = start;
        let mut steps = 0usize;
        loop {
            if steps == limit {
                self.record_fault(EvaluationFault::FlowStepLimitExceeded { node: current, limit });
                return;
            }
            steps += 1;

            let next_slot = match self.execute_node(current) {
                Ok(slot) => slot,
                Err(fault) => {
                    self.record_fault(fault);
                    return;
                }
            };
            let Some(slot) = next_slot else {
                return;
            };
            let Some(next) = self.flow_target(current, slot) else {
                return;
            };
            current = next;
        }
    }

    /// Runs a single node: resolves its inputs, calls its process operation
    /// and caches its outputs. Returns the flow slot to continue on.
    fn execute_node(&mut self, id: NodeId) -> Result<Option<usize>, EvaluationFault> {
        let limit = self.config.max_recursion_depth;
        if self.pass.depth >= limit {
            return Err(EvaluationFault::RecursionLimitExceeded { node: id, limit });
        }

        let record = self
            .record_for_eval(id)
            .ok_or(EvaluationFault::NodeMissing { node: id })?;
        // An absent kind means the node is already running further up the
        // stack.
        let mut kind = record.kind.take().ok_or(EvaluationFault::Cycle { node: id })?;
        let metadata = Arc::clone(&record.metadata);
        let variable_inputs = record.variable_inputs;
        let variable_outputs = record.variable_outputs;

        self.pass.depth += 1;
        let result = self.run_kind(id, kind.as_mut(), &metadata, variable_inputs, variable_outputs);
        self.pass.depth -= 1;

        if let Some(record) = self.record_for_eval(id) {
            record.kind = Some(kind);
        }
        result
    }

    fn run_kind(
        &mut self,
        id: NodeId,
        kind: &mut dyn NodeKind,
        metadata: &NodeMetadata,
        variable_inputs: usize,
        variable_outputs: usize,
    ) -> Result<Option<usize>, EvaluationFault> {
        let inputs = self.resolve_inputs(id, metadata, variable_inputs);
        let outputs: Vec<Value> = (0..metadata.outputs_virtual_count(variable_outputs))
            .map(|slot| {
                metadata
                    .output_type(slot, variable_outputs)
                    .map(Value::default_for)
                    .unwrap_or_default()
            })
            .collect();

        let mut ctx = ProcessContext {
            scape: self,
            node: id,
            inputs,
            outputs,
            variable_outputs: metadata.variable_output_range(variable_outputs),
            halted: false,
        };
        let returned = kind.process(&mut ctx);
        let ProcessContext {
            inputs,
            outputs,
            halted,
            ..
        } = ctx;

        self.memory.write(id, outputs.iter().cloned());
        self.pass.nodes_evaluated += 1;

        let next_flow = match &returned {
            Err(_) => None,
            Ok(_) if halted => None,
            Ok(slot) if metadata.returns_flow => *slot,
            Ok(_) if metadata.is_flow_output() => Some(0),
            Ok(_) => None,
        };
        tracing::trace!(node = id.0, title = %metadata.title, ?next_flow, "evaluated node");

        let scope = self.memory.scope();
        if let Some(trace) = &mut self.pass.trace {
            trace.push(TraceEntry {
                node_id: id,
                title: metadata.title.clone(),
                scope,
                inputs,
                outputs,
                next_flow,
            });
        }

        returned
            .map(|_| next_flow)
            .map_err(|error| EvaluationFault::Process {
                node: id,
                title: metadata.title.clone(),
                error,
            })
    }

    /// One value per declared input slot. The variable-size slot is packed
    /// into a [`Value::Array`] of its virtual slots.
    fn resolve_inputs(&mut self, id: NodeId, metadata: &NodeMetadata, variable_inputs: usize) -> Vec<Value> {
        let mut inputs = Vec::with_capacity(metadata.inputs.len());
        for (declared, slot) in metadata.inputs.iter().enumerate() {
            if slot.variable_size {
                let packed = (declared..declared + variable_inputs)
                    .map(|virtual_slot| self.resolve_input(id, virtual_slot, slot.ty))
                    .collect();
                inputs.push(Value::Array(packed));
            } else {
                inputs.push(self.resolve_input(id, declared, slot.ty));
            }
        }
        inputs
    }

    /// Value arriving at a virtual input slot, or the type default if the
    /// slot is unconnected or its source produced nothing usable.
    fn resolve_input(&mut self, id: NodeId, slot: usize, ty: ValueType) -> Value {
        let Some((source, output_slot)) = self.value_source(id, slot) else {
            return Value::default_for(ty);
        };

        // Value nodes are pulled on demand. Flow nodes only run on their
        // own thread; before that, consumers see defaults.
        let pull = !self.memory.has_entry(source) && self.metadata(source).is_some_and(|m| !m.is_flow());
        if pull {
            if let Err(fault) = self.execute_node(source) {
                self.record_fault(fault);
            }
        }

        self.memory
            .read(source, output_slot)
            .cloned()
            .unwrap_or_else(|| Value::default_for(ty))
    }

    fn record_fault(&mut self, fault: EvaluationFault) {
        tracing::warn!(node = fault.node().0, "{}", fault);
        self.pass.faults.push(fault);
    }
}
