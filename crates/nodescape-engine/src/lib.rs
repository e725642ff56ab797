pub mod coercion;
pub mod config;
pub mod document;
pub mod error;
pub mod eval;
pub mod host;
pub mod kind;
pub mod nodes;
pub mod scape;
pub mod trace;

// Re-export commonly used types
pub use config::NodeScapeConfig;
pub use document::{GraphDocument, NodeSpec};
pub use error::{ConnectionError, DocumentError, EvaluationFault, ProcessError, RegisterError};
pub use eval::UpdateReport;
pub use host::{NodeHost, StandaloneHost};
pub use kind::{NodeKind, ProcessContext};
pub use scape::{ConnectionView, NodeRecord, NodeScape, ValueLink, Variable};
pub use trace::TraceEntry;
