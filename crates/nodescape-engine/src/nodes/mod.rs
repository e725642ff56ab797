//! Built-in node kinds.
//!
//! - [`flow`]: triggers and nodes that take part in execution order.
//! - [`value`]: pure computations, pulled lazily by their consumers.
//! - [`convert`]: the cast and to-text adapters the graph inserts between
//!   slots of different types.
//! - [`module`]: a wrapper gating any kind on a host module.

pub mod convert;
pub mod flow;
pub mod module;
pub mod value;

pub use convert::{Cast, ToText};
pub use flow::{Branch, OnceTrigger, Print, Repeat, Sequence, UpdateTrigger, WriteVariable};
pub use module::ModuleBound;
pub use value::{Add, Constant, Equals, JoinText, Not, ReadVariable, SplitText, Sum};
