//! Domain atoms for WorkNest: task and user models, their stores and the
//! task lifecycle rules. Atoms take store handles as arguments and never
//! reach for global clients.

pub mod dynamo;
pub mod error;
pub mod memory;
pub mod response;
pub mod tasks;
pub mod users;

pub use dynamo::DynamoStore;
pub use error::{StoreError, WorkNestError};
pub use memory::MemoryStore;
