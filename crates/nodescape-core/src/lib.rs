pub mod edge;
pub mod error;
pub mod id;
pub mod memory;
pub mod metadata;
pub mod node;
pub mod types;

// Re-export commonly used types
pub use edge::{ConnectionKind, NodeConnection};
pub use error::{CoreError, MetadataError};
pub use id::{EdgeId, GroupId, NodeId};
pub use memory::NodeScapeMemory;
pub use metadata::{NodeMetadata, NodeMetadataBuilder, ProcessKind, SlotDescriptor, SlotSide};
pub use node::{NodeGroup, Position};
pub use types::{Value, ValueType};
