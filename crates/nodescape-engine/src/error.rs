//! Error types for graph editing and evaluation.
//!
//! Editing operations return typed errors so the hosting editor can surface
//! rejected edits. Evaluation never fails as a whole: problems met during a
//! pass are collected as [`EvaluationFault`]s in the pass report, each
//! carrying the [`NodeId`] where it happened.

use nodescape_core::id::NodeId;
use nodescape_core::metadata::SlotSide;
use nodescape_core::types::ValueType;
use nodescape_core::{CoreError, MetadataError};
use serde::Serialize;
use thiserror::Error;

/// Why a connection could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    #[error("node {node} has no flow output slot {slot}")]
    NotFlowOutput { node: NodeId, slot: usize },

    #[error("node {node} has no flow input")]
    NotFlowInput { node: NodeId },

    #[error("{side} slot {slot} out of range for node {node} ({count} slots)")]
    SlotOutOfRange {
        node: NodeId,
        side: SlotSide,
        slot: usize,
        count: usize,
    },

    #[error("cannot connect node {node} to itself")]
    SelfConnection { node: NodeId },

    /// No direct assignment, implicit cast or text conversion exists.
    #[error("incompatible types: cannot connect {from} to {to}")]
    IncompatibleTypes { from: ValueType, to: ValueType },
}

/// Why a node kind could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Evaluation is synchronous; asynchronous process operations are not
    /// accepted.
    #[error("node '{title}' declares an asynchronous process operation, which the evaluator does not await")]
    AsyncNotSupported { title: String },
}

/// Error returned by a node's process operation.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
pub enum ProcessError {
    /// The node has no behaviour for the runtime shape of its inputs.
    #[error("no matching overload: {detail}")]
    NoMatchingOverload { detail: String },

    #[error("{message}")]
    Failed { message: String },
}

impl ProcessError {
    pub fn no_overload(detail: impl Into<String>) -> Self {
        ProcessError::NoMatchingOverload {
            detail: detail.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ProcessError::Failed {
            message: message.into(),
        }
    }
}

/// A problem met during an evaluation pass.
///
/// A fault halts the flow thread it occurred on; other trigger roots in the
/// same pass still run.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
pub enum EvaluationFault {
    #[error("node {node} ('{title}') failed: {error}")]
    Process {
        node: NodeId,
        title: String,
        error: ProcessError,
    },

    /// A node was reached again while its own process operation was running.
    #[error("cycle detected at node {node}")]
    Cycle { node: NodeId },

    #[error("evaluation depth limit ({limit}) exceeded at node {node}")]
    RecursionLimitExceeded { node: NodeId, limit: usize },

    #[error("flow step limit ({limit}) exceeded at node {node}")]
    FlowStepLimitExceeded { node: NodeId, limit: usize },

    #[error("node {node} vanished during evaluation")]
    NodeMissing { node: NodeId },
}

impl EvaluationFault {
    /// The node the fault is attributed to.
    pub fn node(&self) -> NodeId {
        match self {
            EvaluationFault::Process { node, .. }
            | EvaluationFault::Cycle { node }
            | EvaluationFault::RecursionLimitExceeded { node, .. }
            | EvaluationFault::FlowStepLimitExceeded { node, .. }
            | EvaluationFault::NodeMissing { node } => *node,
        }
    }
}

/// Errors while loading a graph document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid graph document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate node key '{key}'")]
    DuplicateKey { key: String },

    #[error("unknown node key '{key}'")]
    UnknownKey { key: String },

    #[error("cannot register node '{key}': {source}")]
    Register { key: String, source: RegisterError },

    #[error("cannot connect '{from}' to '{to}': {source}")]
    Connection {
        from: String,
        to: String,
        source: ConnectionError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}
