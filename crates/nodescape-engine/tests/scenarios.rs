//! End-to-end graph scenarios.
//!
//! Each test builds a graph through the public editing API, runs one or more
//! evaluation passes and checks what the graph printed, cached or reported.
//!
//! Tests cover:
//! - Branch selection from an equality condition
//! - Type defaults for unconnected slots
//! - Adapter insertion for int -> text connections
//! - Replace-on-conflict for flow and value connections
//! - Node deletion cleanup
//! - Branch-local memory scoping
//! - Persistent variables reaching the host

use std::cell::RefCell;
use std::rc::Rc;

use nodescape_core::{NodeId, Position, SlotSide, Value, ValueType};
use nodescape_engine::nodes::{Branch, Constant, Equals, Print, ReadVariable, Sequence, UpdateTrigger, WriteVariable};
use nodescape_engine::{
    ConnectionError, NodeHost, NodeScape, NodeScapeConfig, StandaloneHost, ValueLink,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn at(x: f32, y: f32) -> Position {
    Position::new(x, y)
}

fn text(scape: &mut NodeScape, value: &str) -> NodeId {
    scape.add_node(Constant::new(Value::from(value)), at(0.0, 0.0)).unwrap()
}

/// Print node whose text comes from a constant.
fn print_of(scape: &mut NodeScape, value: &str) -> NodeId {
    let print = scape.add_node(Print, at(0.0, 0.0)).unwrap();
    let source = text(scape, value);
    scape.create_value_connection(source, 0, print, 0).unwrap();
    print
}

/// Host that records persisted variables.
#[derive(Clone, Default)]
struct RecordingHost {
    persisted: Rc<RefCell<Vec<(String, Value)>>>,
}

impl NodeHost for RecordingHost {
    fn is_module_running(&self, _module: &str) -> bool {
        true
    }

    fn persist_variable(&mut self, name: &str, value: &Value) {
        self.persisted.borrow_mut().push((name.to_string(), value.clone()));
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Trigger -> Branch (two flow outputs) -> two prints, with two text nodes
/// feeding an equality node that drives the branch condition.
fn matches_graph(left: &str, right: &str) -> NodeScape {
    let mut scape = NodeScape::with_defaults();
    let trigger = scape.add_node(UpdateTrigger, at(0.0, 0.0)).unwrap();
    let branch = scape.add_node(Branch, at(200.0, 0.0)).unwrap();
    let first = print_of(&mut scape, "first");
    let second = print_of(&mut scape, "second");
    let a = text(&mut scape, left);
    let b = text(&mut scape, right);
    let equals = scape.add_node(Equals, at(100.0, 100.0)).unwrap();

    scape.create_flow_connection(trigger, 0, branch).unwrap();
    scape.create_flow_connection(branch, 0, first).unwrap();
    scape.create_flow_connection(branch, 1, second).unwrap();
    scape.create_value_connection(a, 0, equals, 0).unwrap();
    scape.create_value_connection(b, 0, equals, 1).unwrap();
    scape.create_value_connection(equals, 0, branch, 0).unwrap();
    scape
}

#[test]
fn equal_texts_take_first_branch_only() {
    let mut scape = matches_graph("Matches!", "Matches!");
    let report = scape.update();

    assert!(report.is_clean(), "{:?}", report.faults);
    assert_eq!(report.triggers, 1);
    assert_eq!(report.printed, vec!["first"]);
}

#[test]
fn different_texts_take_second_branch_only() {
    let mut scape = matches_graph("Matches!", "Nope");
    assert_eq!(scape.update().printed, vec!["second"]);
}

#[test]
fn unconnected_bool_input_defaults_to_false() {
    let mut scape = NodeScape::with_defaults();
    let trigger = scape.add_node(UpdateTrigger, at(0.0, 0.0)).unwrap();
    let branch = scape.add_node(Branch, at(0.0, 0.0)).unwrap();
    let on_true = print_of(&mut scape, "true");
    let on_false = print_of(&mut scape, "false");
    scape.create_flow_connection(trigger, 0, branch).unwrap();
    scape.create_flow_connection(branch, 0, on_true).unwrap();
    scape.create_flow_connection(branch, 1, on_false).unwrap();

    let report = scape.update();

    assert!(report.is_clean());
    assert_eq!(report.printed, vec!["false"]);
}

#[test]
fn every_trigger_root_runs_in_id_order() {
    let mut scape = NodeScape::with_defaults();
    let first = scape.add_node(UpdateTrigger, at(0.0, 0.0)).unwrap();
    let second = scape.add_node(UpdateTrigger, at(0.0, 0.0)).unwrap();
    let a = print_of(&mut scape, "a");
    let b = print_of(&mut scape, "b");
    scape.create_flow_connection(second, 0, b).unwrap();
    scape.create_flow_connection(first, 0, a).unwrap();

    let report = scape.update();

    assert_eq!(report.triggers, 2);
    assert_eq!(report.printed, vec!["a", "b"]);
}

#[test]
fn branch_local_values_do_not_leak_past_scope() {
    let mut scape = NodeScape::with_defaults();
    let trigger = scape.add_node(UpdateTrigger, at(0.0, 0.0)).unwrap();
    let sequence = scape.add_node(Sequence, at(0.0, 0.0)).unwrap();
    let inner = scape.add_node(Print, at(0.0, 0.0)).unwrap();
    let outer = scape.add_node(Print, at(0.0, 0.0)).unwrap();
    let scoped = text(&mut scape, "scoped");
    let shared = text(&mut scape, "shared");
    scape.create_flow_connection(trigger, 0, sequence).unwrap();
    scape.create_flow_connection(sequence, 0, inner).unwrap();
    scape.create_flow_connection(sequence, 1, outer).unwrap();
    scape.create_value_connection(scoped, 0, inner, 0).unwrap();
    scape.create_value_connection(shared, 0, outer, 0).unwrap();

    let report = scape.update();

    assert_eq!(report.printed, vec!["scoped", "shared"]);
    let memory = scape.memory();
    assert_eq!(memory.scope(), 0);
    // Computed inside the Sequence's First thread, discarded with its scope.
    assert!(!memory.has_entry(scoped));
    assert!(!memory.has_entry(inner));
    assert!(memory.has_entry(shared));
    assert!(memory.has_entry(outer));
}

#[test]
fn persistent_variable_writes_reach_host() {
    let host = RecordingHost::default();
    let persisted = Rc::clone(&host.persisted);
    let mut scape = NodeScape::new(Box::new(host), NodeScapeConfig::default());
    let trigger = scape.add_node(UpdateTrigger, at(0.0, 0.0)).unwrap();
    let keep = scape.add_node(WriteVariable::new("kept", true), at(0.0, 0.0)).unwrap();
    let temp = scape.add_node(WriteVariable::new("temp", false), at(0.0, 0.0)).unwrap();
    let value = text(&mut scape, "v");
    scape.create_flow_connection(trigger, 0, keep).unwrap();
    scape.create_flow_connection(keep, 0, temp).unwrap();
    scape.create_value_connection(value, 0, keep, 0).unwrap();
    scape.create_value_connection(value, 0, temp, 0).unwrap();

    scape.update();

    assert_eq!(*persisted.borrow(), vec![("kept".to_string(), Value::from("v"))]);
    assert_eq!(scape.read_variable("temp"), Some(&Value::from("v")));
}

#[test]
fn variable_written_earlier_in_pass_is_visible_downstream() {
    let mut scape = NodeScape::with_defaults();
    let trigger = scape.add_node(UpdateTrigger, at(0.0, 0.0)).unwrap();
    let write = scape.add_node(WriteVariable::new("x", false), at(0.0, 0.0)).unwrap();
    let print = scape.add_node(Print, at(0.0, 0.0)).unwrap();
    let read = scape.add_node(ReadVariable::new("x"), at(0.0, 0.0)).unwrap();
    let value = scape.add_node(Constant::new(Value::Int(9)), at(0.0, 0.0)).unwrap();
    scape.create_flow_connection(trigger, 0, write).unwrap();
    scape.create_flow_connection(write, 0, print).unwrap();
    scape.create_value_connection(value, 0, write, 0).unwrap();
    scape.create_value_connection(read, 0, print, 0).unwrap();

    assert_eq!(scape.update().printed, vec!["9"]);
}

// ---------------------------------------------------------------------------
// Editing
// ---------------------------------------------------------------------------

#[test]
fn int_to_text_connection_goes_through_adapter() {
    let mut scape = NodeScape::with_defaults();
    let number = scape.add_node(Constant::new(Value::Int(42)), at(0.0, 0.0)).unwrap();
    let print = scape.add_node(Print, at(300.0, 100.0)).unwrap();

    let link = scape.create_value_connection(number, 0, print, 0).unwrap();

    let ValueLink::Adapted { adapter } = link else {
        panic!("expected an adapter, got {link:?}");
    };
    let connections = scape.connections();
    assert_eq!(connections.len(), 2);
    assert!(connections
        .iter()
        .all(|c| !(c.output_node == number && c.input_node == print)));
    assert_eq!(scape.value_source(adapter, 0), Some((number, 0)));
    assert_eq!(scape.value_source(print, 0), Some((adapter, 0)));
    assert_eq!(scape.metadata(adapter).unwrap().generic_args, vec![ValueType::Int]);
}

#[test]
fn flow_output_slot_holds_one_connection() {
    let mut scape = NodeScape::with_defaults();
    let branch = scape.add_node(Branch, at(0.0, 0.0)).unwrap();
    let a = scape.add_node(Print, at(0.0, 0.0)).unwrap();
    let b = scape.add_node(Print, at(0.0, 0.0)).unwrap();

    scape.create_flow_connection(branch, 1, a).unwrap();
    scape.create_flow_connection(branch, 1, b).unwrap();

    let flows: Vec<_> = scape
        .connections()
        .into_iter()
        .filter(|c| c.connection.is_flow() && c.output_node == branch && c.connection.output_slot == 1)
        .collect();
    assert_eq!(flows.len(), 1);
    assert_eq!(flows[0].input_node, b);
}

#[test]
fn value_input_slot_keeps_old_connection_when_new_one_fails() {
    let mut scape = NodeScape::with_defaults();
    let condition = scape.add_node(Constant::new(Value::Bool(true)), at(0.0, 0.0)).unwrap();
    let word = text(&mut scape, "nope");
    let branch = scape.add_node(Branch, at(0.0, 0.0)).unwrap();
    scape.create_value_connection(condition, 0, branch, 0).unwrap();

    let result = scape.create_value_connection(word, 0, branch, 0);

    assert_eq!(
        result,
        Err(ConnectionError::IncompatibleTypes {
            from: ValueType::Text,
            to: ValueType::Bool
        })
    );
    assert_eq!(scape.value_source(branch, 0), Some((condition, 0)));
}

#[test]
fn deleting_node_leaves_no_dangling_connections() {
    let mut scape = matches_graph("a", "a");
    let equals = scape
        .node_ids()
        .into_iter()
        .find(|&id| scape.metadata(id).is_some_and(|m| m.title == "Equals"))
        .unwrap();
    let before = scape.connection_count();

    scape.delete_node(equals).unwrap();

    assert_eq!(scape.connection_count(), before - 3);
    assert!(scape
        .connections()
        .iter()
        .all(|c| c.output_node != equals && c.input_node != equals));
    // The graph still evaluates; the branch condition falls back to false.
    assert_eq!(scape.update().printed, vec!["second"]);
}

#[test]
fn shrinking_variable_output_drops_connections() {
    use nodescape_engine::nodes::SplitText;

    let mut scape = NodeScape::with_defaults();
    let split = scape.add_node(SplitText::new(3), at(0.0, 0.0)).unwrap();
    let print = scape.add_node(Print, at(0.0, 0.0)).unwrap();
    // Slot 0 is the part count; slots 1..4 are the parts.
    scape.create_value_connection(split, 3, print, 0).unwrap();

    scape.set_variable_size(split, SlotSide::Output, 1).unwrap();

    assert_eq!(scape.value_source(print, 0), None);
    assert_eq!(scape.connection_count(), 0);
}

#[test]
fn standalone_host_with_restricted_modules() {
    let host = StandaloneHost::with_running_modules(["a"]);
    assert!(host.is_module_running("a"));
    assert!(!host.is_module_running("b"));
}
