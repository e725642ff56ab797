//! JSON graph documents.
//!
//! A [`GraphDocument`] describes a graph in terms of document-local node
//! keys: which built-in nodes exist, where they sit, and how they are
//! connected. [`GraphDocument::instantiate`] builds it into a [`NodeScape`]
//! through the regular editing operations, so every connection in a
//! document is type-checked (and adapted) exactly like an interactive edit.
//!
//! ```json
//! {
//!   "nodes": [
//!     { "key": "tick", "kind": "update_trigger" },
//!     { "key": "hello", "kind": "constant", "value": { "Text": "hello" } },
//!     { "key": "out", "kind": "print", "position": { "x": 200.0, "y": 0.0 } }
//!   ],
//!   "flows": [{ "from": "tick", "to": "out" }],
//!   "values": [{ "from": "hello", "to": "out" }]
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use nodescape_core::id::NodeId;
use nodescape_core::node::Position;
use nodescape_core::types::{Value, ValueType};

use crate::error::DocumentError;
use crate::kind::NodeKind;
use crate::nodes::{
    Add, Branch, Cast, Constant, Equals, JoinText, ModuleBound, Not, OnceTrigger, Print, ReadVariable, Repeat,
    Sequence, SplitText, Sum, ToText, UpdateTrigger, WriteVariable,
};
use crate::scape::NodeScape;

/// A built-in node kind with its instance parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    UpdateTrigger,
    OnceTrigger,
    Branch,
    Sequence,
    Repeat,
    Print,
    WriteVariable {
        name: String,
        #[serde(default)]
        persistent: bool,
    },
    ReadVariable {
        name: String,
    },
    Constant {
        value: Value,
    },
    Equals,
    Not,
    Add {
        /// Operand type of a typed add; omitted for the `Any` overload set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operand: Option<ValueType>,
    },
    Sum {
        #[serde(default = "default_slots")]
        terms: usize,
    },
    JoinText {
        #[serde(default = "default_slots")]
        parts: usize,
    },
    SplitText {
        #[serde(default = "default_slots")]
        parts: usize,
    },
    Cast {
        from: ValueType,
        to: ValueType,
    },
    ToText {
        from: ValueType,
    },
}

fn default_slots() -> usize {
    2
}

impl NodeSpec {
    /// Creates a fresh node kind instance.
    pub fn to_kind(&self) -> Box<dyn NodeKind> {
        match self {
            NodeSpec::UpdateTrigger => Box::new(UpdateTrigger),
            NodeSpec::OnceTrigger => Box::new(OnceTrigger::default()),
            NodeSpec::Branch => Box::new(Branch),
            NodeSpec::Sequence => Box::new(Sequence),
            NodeSpec::Repeat => Box::new(Repeat),
            NodeSpec::Print => Box::new(Print),
            NodeSpec::WriteVariable { name, persistent } => Box::new(WriteVariable::new(name.clone(), *persistent)),
            NodeSpec::ReadVariable { name } => Box::new(ReadVariable::new(name.clone())),
            NodeSpec::Constant { value } => Box::new(Constant::new(value.clone())),
            NodeSpec::Equals => Box::new(Equals),
            NodeSpec::Not => Box::new(Not),
            NodeSpec::Add { operand } => Box::new(Add { operand: *operand }),
            NodeSpec::Sum { terms } => Box::new(Sum::new(*terms)),
            NodeSpec::JoinText { parts } => Box::new(JoinText::new(*parts)),
            NodeSpec::SplitText { parts } => Box::new(SplitText::new(*parts)),
            NodeSpec::Cast { from, to } => Box::new(Cast::new(*from, *to)),
            NodeSpec::ToText { from } => Box::new(ToText::new(*from)),
        }
    }
}

/// A node in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub key: String,
    #[serde(flatten)]
    pub spec: NodeSpec,
    #[serde(default)]
    pub position: Position,
    /// Gate the node on this host module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEntry {
    pub from: String,
    #[serde(default)]
    pub slot: usize,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueEntry {
    pub from: String,
    #[serde(default)]
    pub from_slot: usize,
    pub to: String,
    #[serde(default)]
    pub to_slot: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub title: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub persistent: bool,
}

/// A serialized graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub flows: Vec<FlowEntry>,
    #[serde(default)]
    pub values: Vec<ValueEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
    #[serde(default)]
    pub variables: Vec<VariableEntry>,
}

impl GraphDocument {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Adds the document's variables, nodes, connections and groups to
    /// `scape`, in that order. Returns the id assigned to each node key.
    ///
    /// Stops at the first failing entry; whatever was added before it stays
    /// in the graph.
    pub fn instantiate(&self, scape: &mut NodeScape) -> Result<IndexMap<String, NodeId>, DocumentError> {
        for variable in &self.variables {
            scape.write_variable(variable.name.clone(), variable.value.clone(), variable.persistent);
        }

        let mut ids: IndexMap<String, NodeId> = IndexMap::new();
        for entry in &self.nodes {
            if ids.contains_key(&entry.key) {
                return Err(DocumentError::DuplicateKey {
                    key: entry.key.clone(),
                });
            }
            let kind: Box<dyn NodeKind> = match &entry.module {
                Some(module) => Box::new(ModuleBound::boxed(module.clone(), entry.spec.to_kind())),
                None => entry.spec.to_kind(),
            };
            let id = scape
                .add_boxed_node(kind, entry.position)
                .map_err(|source| DocumentError::Register {
                    key: entry.key.clone(),
                    source,
                })?;
            ids.insert(entry.key.clone(), id);
        }

        for flow in &self.flows {
            let from = lookup(&ids, &flow.from)?;
            let to = lookup(&ids, &flow.to)?;
            scape
                .create_flow_connection(from, flow.slot, to)
                .map_err(|source| DocumentError::Connection {
                    from: flow.from.clone(),
                    to: flow.to.clone(),
                    source,
                })?;
        }

        for value in &self.values {
            let from = lookup(&ids, &value.from)?;
            let to = lookup(&ids, &value.to)?;
            scape
                .create_value_connection(from, value.from_slot, to, value.to_slot)
                .map_err(|source| DocumentError::Connection {
                    from: value.from.clone(),
                    to: value.to.clone(),
                    source,
                })?;
        }

        for group in &self.groups {
            let members = group
                .nodes
                .iter()
                .map(|key| lookup(&ids, key))
                .collect::<Result<Vec<_>, _>>()?;
            scape.create_group(group.title.clone(), members)?;
        }

        tracing::debug!(
            "instantiated graph document: {} nodes, {} connections",
            ids.len(),
            scape.connection_count()
        );
        Ok(ids)
    }
}

fn lookup(ids: &IndexMap<String, NodeId>, key: &str) -> Result<NodeId, DocumentError> {
    ids.get(key)
        .copied()
        .ok_or_else(|| DocumentError::UnknownKey { key: key.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;

    const MATCHES: &str = r#"{
        "nodes": [
            { "key": "tick", "kind": "update_trigger" },
            { "key": "left", "kind": "constant", "value": { "Text": "Matches!" } },
            { "key": "right", "kind": "constant", "value": { "Text": "Matches!" } },
            { "key": "same", "kind": "equals" },
            { "key": "branch", "kind": "branch" },
            { "key": "yes", "kind": "print" },
            { "key": "no", "kind": "print" },
            { "key": "yes_text", "kind": "constant", "value": { "Text": "equal" } },
            { "key": "no_text", "kind": "constant", "value": { "Text": "different" } }
        ],
        "flows": [
            { "from": "tick", "to": "branch" },
            { "from": "branch", "slot": 0, "to": "yes" },
            { "from": "branch", "slot": 1, "to": "no" }
        ],
        "values": [
            { "from": "left", "to": "same", "to_slot": 0 },
            { "from": "right", "to": "same", "to_slot": 1 },
            { "from": "same", "to": "branch" },
            { "from": "yes_text", "to": "yes" },
            { "from": "no_text", "to": "no" }
        ],
        "groups": [{ "title": "condition", "nodes": ["left", "right", "same"] }]
    }"#;

    #[test]
    fn document_instantiates_and_runs() {
        let document = GraphDocument::from_json(MATCHES).unwrap();
        let mut scape = NodeScape::with_defaults();
        let ids = document.instantiate(&mut scape).unwrap();

        assert_eq!(ids.len(), 9);
        assert_eq!(scape.connection_count(), 8);
        assert_eq!(scape.groups().count(), 1);

        let report = scape.update();
        assert!(report.is_clean());
        assert_eq!(report.printed, vec!["equal"]);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let json = r#"{ "nodes": [{ "key": "a", "kind": "print" }, { "key": "a", "kind": "branch" }] }"#;
        let document = GraphDocument::from_json(json).unwrap();
        let err = document.instantiate(&mut NodeScape::with_defaults()).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateKey { key } if key == "a"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let json = r#"{ "nodes": [{ "key": "a", "kind": "print" }], "flows": [{ "from": "ghost", "to": "a" }] }"#;
        let document = GraphDocument::from_json(json).unwrap();
        let err = document.instantiate(&mut NodeScape::with_defaults()).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownKey { key } if key == "ghost"));
    }

    #[test]
    fn incompatible_value_connection_is_reported() {
        let json = r#"{
            "nodes": [
                { "key": "word", "kind": "constant", "value": { "Text": "x" } },
                { "key": "if", "kind": "branch" }
            ],
            "values": [{ "from": "word", "to": "if" }]
        }"#;
        let document = GraphDocument::from_json(json).unwrap();
        let err = document.instantiate(&mut NodeScape::with_defaults()).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Connection {
                source: ConnectionError::IncompatibleTypes {
                    from: ValueType::Text,
                    to: ValueType::Bool
                },
                ..
            }
        ));
    }

    #[test]
    fn add_operand_is_optional() {
        let json = r#"{
            "nodes": [
                { "key": "any", "kind": "add" },
                { "key": "int", "kind": "add", "operand": "Int" }
            ]
        }"#;
        let document = GraphDocument::from_json(json).unwrap();
        assert_eq!(document.nodes[0].spec, NodeSpec::Add { operand: None });
        assert_eq!(
            document.nodes[1].spec,
            NodeSpec::Add {
                operand: Some(ValueType::Int)
            }
        );

        let mut scape = NodeScape::with_defaults();
        let ids = document.instantiate(&mut scape).unwrap();
        assert_eq!(scape.node(ids["int"]).unwrap().output_type(0), Some(ValueType::Int));
    }

    #[test]
    fn unknown_kind_is_a_json_error() {
        let json = r#"{ "nodes": [{ "key": "a", "kind": "teleport" }] }"#;
        assert!(matches!(GraphDocument::from_json(json), Err(DocumentError::Json(_))));
    }

    #[test]
    fn variables_are_written_before_nodes_run() {
        let json = r#"{
            "variables": [{ "name": "greeting", "value": { "Text": "hi" } }],
            "nodes": [
                { "key": "tick", "kind": "update_trigger" },
                { "key": "read", "kind": "read_variable", "name": "greeting" },
                { "key": "out", "kind": "print" }
            ],
            "flows": [{ "from": "tick", "to": "out" }],
            "values": [{ "from": "read", "to": "out" }]
        }"#;
        let document = GraphDocument::from_json(json).unwrap();
        let mut scape = NodeScape::with_defaults();
        document.instantiate(&mut scape).unwrap();
        assert_eq!(scape.update().printed, vec!["hi"]);
    }

    #[test]
    fn document_shape() {
        let document = GraphDocument {
            nodes: vec![
                NodeEntry {
                    key: "t".into(),
                    spec: NodeSpec::UpdateTrigger,
                    position: Position::default(),
                    module: None,
                },
                NodeEntry {
                    key: "p".into(),
                    spec: NodeSpec::Print,
                    position: Position::new(10.5, 0.0),
                    module: Some("chatbox".into()),
                },
            ],
            flows: vec![FlowEntry {
                from: "t".into(),
                slot: 0,
                to: "p".into(),
            }],
            ..GraphDocument::default()
        };
        let json = serde_json::to_string(&document).unwrap();
        insta::assert_snapshot!(json, @r#"{"nodes":[{"key":"t","kind":"update_trigger","position":{"x":0.0,"y":0.0}},{"key":"p","kind":"print","position":{"x":10.5,"y":0.0},"module":"chatbox"}],"flows":[{"from":"t","slot":0,"to":"p"}],"values":[],"groups":[],"variables":[]}"#);

        let back = GraphDocument::from_json(&json).unwrap();
        assert_eq!(back, document);
    }
}
