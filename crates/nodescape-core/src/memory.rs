//! Scoped per-pass memory of node outputs.
//!
//! [`NodeScapeMemory`] holds the most recent output tuple of every node that
//! ran during the current evaluation pass. Entries are tagged with the scope
//! depth they were written at; popping a scope discards everything written
//! deeper than the new depth, so values computed inside one flow branch are
//! never reused by a sibling branch or by the code after the branch.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::id::NodeId;
use crate::types::Value;

/// Output values of one node, inline for the common small-arity case.
pub type OutputValues = SmallVec<[Value; 4]>;

#[derive(Debug, Clone)]
struct MemoryEntry {
    values: OutputValues,
    scope: usize,
}

/// Write-once-per-pass cache keyed by node identity, with nested scopes.
#[derive(Debug, Clone, Default)]
pub struct NodeScapeMemory {
    entries: HashMap<NodeId, MemoryEntry>,
    scope: usize,
}

impl NodeScapeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every entry and returns to scope 0.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.scope = 0;
    }

    /// Replaces the node's entry with `values`, tagged with the current scope.
    pub fn write(&mut self, node: NodeId, values: impl IntoIterator<Item = Value>) {
        self.entries.insert(
            node,
            MemoryEntry {
                values: values.into_iter().collect(),
                scope: self.scope,
            },
        );
    }

    /// Value at `slot` of the node's entry, if the node has one.
    pub fn read(&self, node: NodeId, slot: usize) -> Option<&Value> {
        self.entries.get(&node).and_then(|e| e.values.get(slot))
    }

    /// All values of the node's entry.
    pub fn values(&self, node: NodeId) -> Option<&[Value]> {
        self.entries.get(&node).map(|e| e.values.as_slice())
    }

    pub fn has_entry(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    /// Drops the node's entry regardless of scope.
    pub fn forget(&mut self, node: NodeId) {
        self.entries.remove(&node);
    }

    pub fn push(&mut self) {
        self.scope += 1;
    }

    /// Leaves the current scope, discarding every entry written inside it.
    ///
    /// # Panics
    ///
    /// Panics when called at scope 0; push and pop must be balanced.
    pub fn pop(&mut self) {
        assert!(self.scope > 0, "NodeScapeMemory::pop called at scope 0 (unbalanced push/pop)");
        self.scope -= 1;
        let depth = self.scope;
        self.entries.retain(|_, entry| entry.scope <= depth);
    }

    /// Current scope depth.
    pub fn scope(&self) -> usize {
        self.scope
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn write_then_read() {
        let mut memory = NodeScapeMemory::new();
        memory.write(NodeId(1), [Value::Int(4), Value::Bool(true)]);
        assert!(memory.has_entry(NodeId(1)));
        assert_eq!(memory.read(NodeId(1), 1), Some(&Value::Bool(true)));
        assert_eq!(memory.read(NodeId(1), 2), None);
        assert_eq!(memory.read(NodeId(2), 0), None);
    }

    #[test]
    fn rewrite_replaces_entry() {
        let mut memory = NodeScapeMemory::new();
        memory.write(NodeId(1), [Value::Int(1)]);
        memory.write(NodeId(1), [Value::Int(2)]);
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.read(NodeId(1), 0), Some(&Value::Int(2)));
    }

    #[test]
    fn pop_discards_nested_entries() {
        let mut memory = NodeScapeMemory::new();
        memory.write(NodeId(0), [Value::Int(0)]);
        memory.push();
        memory.write(NodeId(1), [Value::Int(1)]);
        memory.pop();
        assert!(memory.has_entry(NodeId(0)));
        assert!(!memory.has_entry(NodeId(1)));
    }

    #[test]
    fn rewrite_inside_scope_is_discarded_with_scope() {
        let mut memory = NodeScapeMemory::new();
        memory.write(NodeId(0), [Value::Int(0)]);
        memory.push();
        memory.write(NodeId(0), [Value::Int(5)]);
        memory.pop();
        assert!(!memory.has_entry(NodeId(0)));
    }

    #[test]
    fn reset_clears_and_returns_to_root() {
        let mut memory = NodeScapeMemory::new();
        memory.push();
        memory.write(NodeId(3), [Value::Null]);
        memory.reset();
        assert!(memory.is_empty());
        assert_eq!(memory.scope(), 0);
    }

    #[test]
    #[should_panic(expected = "unbalanced")]
    fn pop_below_zero_panics() {
        let mut memory = NodeScapeMemory::new();
        memory.pop();
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push,
        Pop,
        Write(u32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Push),
            Just(Op::Pop),
            (0u32..8).prop_map(Op::Write),
        ]
    }

    proptest! {
        #[test]
        fn entries_never_outlive_their_scope(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let mut memory = NodeScapeMemory::new();
            memory.write(NodeId(100), [Value::Int(0)]);
            // Depth each live node was last written at.
            let mut model: HashMap<NodeId, usize> = HashMap::new();
            model.insert(NodeId(100), 0);

            for op in ops {
                match op {
                    Op::Push => memory.push(),
                    Op::Pop => {
                        // Keep the sequence balanced: skip pops at the root.
                        if memory.scope() == 0 {
                            continue;
                        }
                        memory.pop();
                        let depth = memory.scope();
                        model.retain(|_, d| *d <= depth);
                    }
                    Op::Write(n) => {
                        memory.write(NodeId(n), [Value::Int(n as i32)]);
                        model.insert(NodeId(n), memory.scope());
                    }
                }
                for n in 0..8 {
                    prop_assert_eq!(memory.has_entry(NodeId(n)), model.contains_key(&NodeId(n)));
                }
            }
            // The root-scope entry survives every balanced push/pop sequence.
            prop_assert!(memory.has_entry(NodeId(100)));
        }
    }
}
