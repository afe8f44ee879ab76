//! Dashboard block: aggregates task snapshots from the atoms layer into the
//! admin and per-user dashboard payloads.

pub mod dashboard;
pub mod types;

pub use dashboard::*;
pub use types::{Charts, DashboardData, RecentTask, Statistics};
