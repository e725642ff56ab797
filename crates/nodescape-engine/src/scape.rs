//! NodeScape: the node graph container.
//!
//! [`NodeScape`] owns the nodes, their flow and value connections, node
//! groups, graph variables and the per-pass memory. All edits go through its
//! methods so the connection invariants always hold:
//!
//! - a flow output slot feeds at most one flow connection, and
//! - a value input slot receives at most one value connection.
//!
//! A new connection on an occupied slot replaces the old one. Value
//! connections are type-checked; when the types differ but a conversion
//! exists, an adapter node is inserted between the two slots.
//!
//! Evaluation lives in [`crate::eval`].

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};

use nodescape_core::edge::NodeConnection;
use nodescape_core::error::CoreError;
use nodescape_core::id::{EdgeId, GroupId, NodeId};
use nodescape_core::memory::NodeScapeMemory;
use nodescape_core::metadata::{NodeMetadata, NodeMetadataBuilder, SlotSide};
use nodescape_core::node::{NodeGroup, Position};
use nodescape_core::types::{Value, ValueType};

use crate::coercion::{self, Adapter, Coercion};
use crate::config::NodeScapeConfig;
use crate::error::{ConnectionError, RegisterError};
use crate::eval::PassState;
use crate::host::{NodeHost, StandaloneHost};
use crate::kind::NodeKind;
use crate::nodes::{Cast, ToText};

/// A node placed in the graph.
#[derive(Debug)]
pub struct NodeRecord {
    pub id: NodeId,
    pub position: Position,
    pub z_index: i32,
    /// Virtual slots of the variable-size input, if the kind declares one.
    pub variable_inputs: usize,
    /// Virtual slots of the variable-size output, if the kind declares one.
    pub variable_outputs: usize,
    /// Set on cast and to-text nodes the graph inserted itself.
    pub is_adapter: bool,
    pub(crate) metadata: Arc<NodeMetadata>,
    /// Taken out while the node's process operation runs.
    pub(crate) kind: Option<Box<dyn NodeKind>>,
}

impl NodeRecord {
    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    pub fn inputs_virtual_count(&self) -> usize {
        self.metadata.inputs_virtual_count(self.variable_inputs)
    }

    pub fn outputs_virtual_count(&self) -> usize {
        self.metadata.outputs_virtual_count(self.variable_outputs)
    }

    pub fn input_type(&self, slot: usize) -> Option<ValueType> {
        self.metadata.input_type(slot, self.variable_inputs)
    }

    pub fn output_type(&self, slot: usize) -> Option<ValueType> {
        self.metadata.output_type(slot, self.variable_outputs)
    }
}

/// A graph variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub value: Value,
    pub persistent: bool,
}

/// Result of a successful value connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueLink {
    /// The output feeds the input directly.
    Direct(EdgeId),
    /// An adapter node was inserted: output -> adapter -> input.
    Adapted { adapter: NodeId },
}

/// A connection as seen from outside the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionView {
    pub id: EdgeId,
    pub output_node: NodeId,
    pub input_node: NodeId,
    pub connection: NodeConnection,
}

/// The node graph container and evaluator.
pub struct NodeScape {
    graph: StableGraph<NodeRecord, NodeConnection, Directed, u32>,
    /// Node ids are never reused, unlike graph indices.
    node_index: HashMap<NodeId, NodeIndex<u32>>,
    next_node_id: u32,
    metadata_cache: HashMap<String, Arc<NodeMetadata>>,
    groups: IndexMap<GroupId, NodeGroup>,
    next_group_id: u32,
    variables: IndexMap<String, Variable>,
    host: Box<dyn NodeHost>,
    pub(crate) config: NodeScapeConfig,
    pub(crate) memory: NodeScapeMemory,
    pub(crate) pass: PassState,
}

impl NodeScape {
    pub fn new(host: Box<dyn NodeHost>, config: NodeScapeConfig) -> Self {
        let pass = PassState::new(config.trace_enabled);
        NodeScape {
            graph: StableGraph::new(),
            node_index: HashMap::new(),
            next_node_id: 0,
            metadata_cache: HashMap::new(),
            groups: IndexMap::new(),
            next_group_id: 0,
            variables: IndexMap::new(),
            host,
            config,
            memory: NodeScapeMemory::new(),
            pass,
        }
    }

    /// A graph with a [`StandaloneHost`] and default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Box::new(StandaloneHost::new()), NodeScapeConfig::default())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &NodeScapeConfig {
        &self.config
    }

    pub fn host(&self) -> &dyn NodeHost {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn NodeHost {
        self.host.as_mut()
    }

    /// The per-pass memory as left by the last evaluation.
    pub fn memory(&self) -> &NodeScapeMemory {
        &self.memory
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.graph.node_weight(self.index_of(id)?)
    }

    pub fn metadata(&self, id: NodeId) -> Option<&NodeMetadata> {
        self.node(id).map(NodeRecord::metadata)
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.node_index.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn connections(&self) -> Vec<ConnectionView> {
        self.graph
            .edge_indices()
            .filter_map(|idx| {
                let (output, input) = self.graph.edge_endpoints(idx)?;
                Some(ConnectionView {
                    id: EdgeId::from(idx),
                    output_node: self.graph[output].id,
                    input_node: self.graph[input].id,
                    connection: *self.graph.edge_weight(idx)?,
                })
            })
            .collect()
    }

    /// The node a flow output slot leads to.
    pub fn flow_target(&self, node: NodeId, slot: usize) -> Option<NodeId> {
        self.graph
            .edges_directed(self.index_of(node)?, Direction::Outgoing)
            .find(|e| e.weight().is_flow() && e.weight().output_slot == slot)
            .map(|e| self.graph[e.target()].id)
    }

    /// The `(node, output slot)` feeding a value input slot.
    pub fn value_source(&self, node: NodeId, slot: usize) -> Option<(NodeId, usize)> {
        self.graph
            .edges_directed(self.index_of(node)?, Direction::Incoming)
            .find(|e| e.weight().is_value() && e.weight().input_slot == slot)
            .map(|e| (self.graph[e.source()].id, e.weight().output_slot))
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Builds and caches the metadata of a node kind. Idempotent: later
    /// calls with the same metadata key return the cached metadata.
    pub fn register_node(&mut self, kind: &dyn NodeKind) -> Result<Arc<NodeMetadata>, RegisterError> {
        let key = kind.metadata_key();
        if let Some(metadata) = self.metadata_cache.get(&key) {
            return Ok(Arc::clone(metadata));
        }

        let metadata = kind
            .describe(NodeMetadataBuilder::new(kind.type_name()))
            .build()?;
        if metadata.is_async {
            return Err(RegisterError::AsyncNotSupported {
                title: metadata.title,
            });
        }

        tracing::debug!("registered node kind '{}'", key);
        let metadata = Arc::new(metadata);
        self.metadata_cache.insert(key, Arc::clone(&metadata));
        Ok(metadata)
    }

    /// Number of distinct metadata entries built so far.
    pub fn registered_kinds(&self) -> usize {
        self.metadata_cache.len()
    }

    /// Adds a node at `position`, registering its kind first.
    pub fn add_node(&mut self, kind: impl NodeKind + 'static, position: Position) -> Result<NodeId, RegisterError> {
        self.add_boxed_node(Box::new(kind), position)
    }

    pub fn add_boxed_node(&mut self, kind: Box<dyn NodeKind>, position: Position) -> Result<NodeId, RegisterError> {
        let metadata = self.register_node(kind.as_ref())?;
        let variable_inputs = if metadata.has_variable_input() {
            kind.initial_variable_size(SlotSide::Input)
        } else {
            0
        };
        let variable_outputs = if metadata.has_variable_output() {
            kind.initial_variable_size(SlotSide::Output)
        } else {
            0
        };
        let z_index = self.top_z_index() + 1;
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        let idx = self.graph.add_node(NodeRecord {
            id,
            position,
            z_index,
            variable_inputs,
            variable_outputs,
            is_adapter: false,
            metadata,
            kind: Some(kind),
        });
        self.node_index.insert(id, idx);
        Ok(id)
    }

    /// Removes a node together with every connection that references it,
    /// its memory entry and its group memberships. Groups left empty are
    /// removed, and so are adapters that fed only this node.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), CoreError> {
        let idx = self.node_index.remove(&id).ok_or(CoreError::NodeNotFound { id })?;
        let sources: Vec<NodeIndex<u32>> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().is_value())
            .map(|e| e.source())
            .collect();
        self.graph.remove_node(idx);
        self.memory.forget(id);
        for group in self.groups.values_mut() {
            group.remove(id);
        }
        self.groups.retain(|_, group| !group.is_empty());
        tracing::debug!("deleted node {}", id);

        for source in sources {
            self.drop_unused_adapter(source);
        }
        Ok(())
    }

    pub fn move_node(&mut self, id: NodeId, position: Position) -> Result<(), CoreError> {
        self.record_mut(id)?.position = position;
        Ok(())
    }

    /// Places a node above every other node.
    pub fn bring_to_front(&mut self, id: NodeId) -> Result<(), CoreError> {
        let top = self.top_z_index();
        let tied = self.graph.node_weights().filter(|r| r.z_index == top).count();
        let record = self.record_mut(id)?;
        if record.z_index < top || tied > 1 {
            record.z_index = top + 1;
        }
        Ok(())
    }

    /// Resizes a node's variable-size slot. Connections on virtual slots
    /// that no longer exist are removed.
    pub fn set_variable_size(&mut self, id: NodeId, side: SlotSide, size: usize) -> Result<(), CoreError> {
        let record = self.record_mut(id)?;
        let has_slot = match side {
            SlotSide::Input => record.metadata.has_variable_input(),
            SlotSide::Output => record.metadata.has_variable_output(),
        };
        if !has_slot {
            return Err(CoreError::NoVariableSlot { node: id, side });
        }
        let count = match side {
            SlotSide::Input => {
                record.variable_inputs = size;
                record.inputs_virtual_count()
            }
            SlotSide::Output => {
                record.variable_outputs = size;
                record.outputs_virtual_count()
            }
        };

        let direction = match side {
            SlotSide::Input => Direction::Incoming,
            SlotSide::Output => Direction::Outgoing,
        };
        let Some(idx) = self.index_of(id) else {
            return Err(CoreError::NodeNotFound { id });
        };
        let stale: Vec<(EdgeIndex<u32>, NodeIndex<u32>)> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| {
                let conn = e.weight();
                conn.is_value()
                    && match side {
                        SlotSide::Input => conn.input_slot >= count,
                        SlotSide::Output => conn.output_slot >= count,
                    }
            })
            .map(|e| (e.id(), e.source()))
            .collect();
        for (edge, _) in &stale {
            self.graph.remove_edge(*edge);
        }
        self.memory.forget(id);
        for (_, source) in stale {
            self.drop_unused_adapter(source);
        }
        Ok(())
    }

    fn top_z_index(&self) -> i32 {
        self.graph.node_weights().map(|r| r.z_index).max().unwrap_or(0)
    }

    fn index_of(&self, id: NodeId) -> Option<NodeIndex<u32>> {
        self.node_index.get(&id).copied()
    }

    fn record(&self, id: NodeId) -> Result<&NodeRecord, ConnectionError> {
        self.node(id).ok_or(ConnectionError::NodeNotFound { id })
    }

    fn record_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, CoreError> {
        self.record_for_eval(id).ok_or(CoreError::NodeNotFound { id })
    }

    /// Deletes an inserted adapter that no longer feeds any node.
    fn drop_unused_adapter(&mut self, idx: NodeIndex<u32>) {
        let Some(record) = self.graph.node_weight(idx) else {
            return;
        };
        let unused = record.is_adapter
            && self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .next()
                .is_none();
        if unused {
            let id = record.id;
            if self.delete_node(id).is_ok() {
                tracing::debug!("removed unused adapter {}", id);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Connects a flow output slot to a node's flow input, replacing any
    /// connection the slot already had.
    pub fn create_flow_connection(
        &mut self,
        output: NodeId,
        output_slot: usize,
        input: NodeId,
    ) -> Result<EdgeId, ConnectionError> {
        let out_record = self.record(output)?;
        if output_slot >= out_record.metadata.flow_outputs.len() {
            return Err(ConnectionError::NotFlowOutput {
                node: output,
                slot: output_slot,
            });
        }
        if !self.record(input)?.metadata.is_flow_input {
            return Err(ConnectionError::NotFlowInput { node: input });
        }

        let out_idx = self.index_of(output).ok_or(ConnectionError::NodeNotFound { id: output })?;
        let in_idx = self.index_of(input).ok_or(ConnectionError::NodeNotFound { id: input })?;

        if let Some(old) = self.outgoing_flow_edge(out_idx, output_slot) {
            self.graph.remove_edge(old);
            tracing::debug!("replaced flow connection from {}:{}", output, output_slot);
        }
        let idx = self
            .graph
            .add_edge(out_idx, in_idx, NodeConnection::flow(output_slot));
        tracing::debug!("flow {}:{} -> {}", output, output_slot, input);
        Ok(EdgeId::from(idx))
    }

    /// Connects a value output slot to a value input slot.
    ///
    /// Compatible types connect directly. Otherwise a cast node (implicit
    /// numeric widening) or a to-text node (text inputs) is inserted between
    /// the two slots. Any connection the input slot already had is removed
    /// only once the new one is established.
    pub fn create_value_connection(
        &mut self,
        output: NodeId,
        output_slot: usize,
        input: NodeId,
        input_slot: usize,
    ) -> Result<ValueLink, ConnectionError> {
        if output == input {
            return Err(ConnectionError::SelfConnection { node: output });
        }
        let out_record = self.record(output)?;
        let from = out_record
            .output_type(output_slot)
            .ok_or(ConnectionError::SlotOutOfRange {
                node: output,
                side: SlotSide::Output,
                slot: output_slot,
                count: out_record.outputs_virtual_count(),
            })?;
        let out_position = out_record.position;
        let in_record = self.record(input)?;
        let to = in_record
            .input_type(input_slot)
            .ok_or(ConnectionError::SlotOutOfRange {
                node: input,
                side: SlotSide::Input,
                slot: input_slot,
                count: in_record.inputs_virtual_count(),
            })?;
        let in_position = in_record.position;

        let Some(coercion) = coercion::resolve(from, to) else {
            tracing::warn!(
                "rejected value connection {}:{} -> {}:{}: {} is not convertible to {}",
                output,
                output_slot,
                input,
                input_slot,
                from,
                to
            );
            return Err(ConnectionError::IncompatibleTypes { from, to });
        };

        match coercion {
            Coercion::Direct => {
                let out_idx = self.index_of(output).ok_or(ConnectionError::NodeNotFound { id: output })?;
                let in_idx = self.index_of(input).ok_or(ConnectionError::NodeNotFound { id: input })?;
                self.remove_incoming_value_edge(in_idx, input_slot);
                let idx = self
                    .graph
                    .add_edge(out_idx, in_idx, NodeConnection::value(output_slot, input_slot, from));
                tracing::debug!("value {}:{} -> {}:{} ({})", output, output_slot, input, input_slot, from);
                Ok(ValueLink::Direct(EdgeId::from(idx)))
            }
            Coercion::Adapted(adapter) => {
                let position = out_position.midpoint(in_position);
                let adapter_id = match adapter {
                    Adapter::Cast { from, to } => self.add_node(Cast::new(from, to), position),
                    Adapter::ToText { from } => self.add_node(ToText::new(from), position),
                }
                .map_err(|err| {
                    // Built-in adapters always describe themselves validly.
                    tracing::error!("adapter registration failed: {}", err);
                    ConnectionError::IncompatibleTypes { from, to }
                })?;
                if let Some(record) = self.record_for_eval(adapter_id) {
                    record.is_adapter = true;
                }
                tracing::debug!("inserted {:?} adapter {} between {} and {}", adapter, adapter_id, output, input);

                self.create_value_connection(output, output_slot, adapter_id, 0)?;
                self.create_value_connection(adapter_id, 0, input, input_slot)?;
                Ok(ValueLink::Adapted {
                    adapter: adapter_id,
                })
            }
        }
    }

    /// Removes a connection by id. An inserted adapter left without
    /// consumers is deleted with it.
    pub fn remove_connection(&mut self, id: EdgeId) -> Option<NodeConnection> {
        let (source, _) = self.graph.edge_endpoints(id.into())?;
        let connection = self.graph.remove_edge(id.into())?;
        self.drop_unused_adapter(source);
        Some(connection)
    }

    fn outgoing_flow_edge(&self, node: NodeIndex<u32>, slot: usize) -> Option<EdgeIndex<u32>> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .find(|e| e.weight().is_flow() && e.weight().output_slot == slot)
            .map(|e| e.id())
    }

    /// Drops the value connection into `(node, slot)`. An inserted adapter
    /// that fed it and now feeds nothing is deleted too.
    fn remove_incoming_value_edge(&mut self, node: NodeIndex<u32>, slot: usize) {
        let Some((edge, source)) = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .find(|e| e.weight().is_value() && e.weight().input_slot == slot)
            .map(|e| (e.id(), e.source()))
        else {
            return;
        };
        self.graph.remove_edge(edge);
        tracing::debug!("replaced value connection into {}:{}", self.graph[node].id, slot);
        self.drop_unused_adapter(source);
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    pub fn create_group(
        &mut self,
        title: impl Into<String>,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> Result<GroupId, CoreError> {
        let nodes: Vec<NodeId> = nodes.into_iter().collect();
        if let Some(&missing) = nodes.iter().find(|n| self.node(**n).is_none()) {
            return Err(CoreError::NodeNotFound { id: missing });
        }
        let id = GroupId(self.next_group_id);
        self.next_group_id += 1;
        self.groups.insert(id, NodeGroup::new(id, title).with_nodes(nodes));
        Ok(id)
    }

    pub fn add_to_group(&mut self, group: GroupId, node: NodeId) -> Result<(), CoreError> {
        if self.node(node).is_none() {
            return Err(CoreError::NodeNotFound { id: node });
        }
        self.groups
            .get_mut(&group)
            .ok_or(CoreError::GroupNotFound { id: group })?
            .insert(node);
        Ok(())
    }

    pub fn remove_from_group(&mut self, group: GroupId, node: NodeId) -> Result<bool, CoreError> {
        let entry = self
            .groups
            .get_mut(&group)
            .ok_or(CoreError::GroupNotFound { id: group })?;
        Ok(entry.remove(node))
    }

    pub fn delete_group(&mut self, group: GroupId) -> Result<NodeGroup, CoreError> {
        self.groups
            .shift_remove(&group)
            .ok_or(CoreError::GroupNotFound { id: group })
    }

    pub fn group(&self, id: GroupId) -> Option<&NodeGroup> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &NodeGroup> {
        self.groups.values()
    }

    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    /// Sets a graph variable. Persistent writes are handed to the host.
    pub fn write_variable(&mut self, name: impl Into<String>, value: Value, persistent: bool) {
        let name = name.into();
        if persistent {
            self.host.persist_variable(&name, &value);
        }
        self.variables.insert(name, Variable { value, persistent });
    }

    pub fn read_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).map(|v| &v.value)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    // -----------------------------------------------------------------------
    // Evaluation support
    // -----------------------------------------------------------------------

    /// Trigger nodes in ascending id order.
    pub(crate) fn trigger_nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph[idx].metadata.is_trigger)
            .map(|idx| self.graph[idx].id)
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn record_for_eval(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        let idx = self.index_of(id)?;
        self.graph.node_weight_mut(idx)
    }
}
