//! Evaluator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`NodeScape`](crate::NodeScape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeScapeConfig {
    /// Whether to record a trace entry for every node evaluation.
    pub trace_enabled: bool,
    /// Maximum nesting of lazy value pulls and nested flow triggers.
    /// Default: 256.
    pub max_recursion_depth: usize,
    /// Maximum flow steps a single flow thread may take. Default: 10 000.
    pub max_flow_steps: usize,
}

impl Default for NodeScapeConfig {
    fn default() -> Self {
        NodeScapeConfig {
            trace_enabled: false,
            max_recursion_depth: 256,
            max_flow_steps: 10_000,
        }
    }
}
