use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use worknest_atoms::tasks::model::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    /// Canonical status labels without whitespace, plus `All`
    pub task_distribution: BTreeMap<String, usize>,
    pub task_priority_levels: BTreeMap<String, usize>,
}

/// Projection of a task for the "recent tasks" table.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentTask {
    #[serde(rename = "_id")]
    pub task_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Task> for RecentTask {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.task_id.clone(),
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: task.created_at,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub statistics: Statistics,
    pub charts: Charts,
    pub recent_tasks: Vec<RecentTask>,
}
