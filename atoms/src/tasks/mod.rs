// Re-export model types and service functions
pub mod http;
pub mod model;
pub mod progress;
pub mod service;
pub mod store;

pub use http::*;
pub use model::{
    ChecklistItem, CreateTaskPayload, StatusSummary, Task, TaskListing, TaskPriority, TaskStatus,
    TaskView, UpdateTaskPayload,
};
pub use store::{TaskQuery, TaskStore};
