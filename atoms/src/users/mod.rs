pub mod account;
pub mod http;
pub mod model;
pub mod password;
pub mod service;

pub use http::*;
pub use model::{Credentials, User, UserRole, UserSummary, UserWithTaskCounts};
pub use service::*;
