use chrono::{DateTime, Utc};
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::BTreeMap;
use worknest_atoms::response::respond;
use worknest_atoms::tasks::model::{Task, TaskPriority, TaskStatus};
use worknest_atoms::tasks::store::{TaskQuery, TaskStore};
use worknest_atoms::users::model::User;
use worknest_atoms::WorkNestError;

use crate::types::{Charts, DashboardData, RecentTask, Statistics};

pub const RECENT_TASK_LIMIT: usize = 10;

/// Not completed and due strictly before `now`. Tasks without a due date are
/// never overdue.
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    task.status != TaskStatus::Completed && task.due_date.is_some_and(|due| due < now)
}

/// Aggregate a task snapshot into dashboard statistics, zero-filled charts
/// and the most recently created tasks.
pub fn summarize(tasks: &[Task], now: DateTime<Utc>) -> DashboardData {
    let count_status = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

    let statistics = Statistics {
        total_tasks: tasks.len(),
        pending_tasks: count_status(TaskStatus::Pending),
        completed_tasks: count_status(TaskStatus::Completed),
        overdue_tasks: tasks.iter().filter(|t| is_overdue(t, now)).count(),
    };

    let mut task_distribution: BTreeMap<String, usize> = TaskStatus::ALL
        .iter()
        .map(|&status| (status.as_str().replace(char::is_whitespace, ""), count_status(status)))
        .collect();
    task_distribution.insert("All".to_string(), tasks.len());

    let task_priority_levels = TaskPriority::ALL
        .iter()
        .map(|&priority| {
            let count = tasks.iter().filter(|t| t.priority == priority).count();
            (priority.as_str().to_string(), count)
        })
        .collect();

    let mut newest: Vec<&Task> = tasks.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_tasks = newest
        .into_iter()
        .take(RECENT_TASK_LIMIT)
        .map(RecentTask::from)
        .collect();

    DashboardData {
        statistics,
        charts: Charts {
            task_distribution,
            task_priority_levels,
        },
        recent_tasks,
    }
}

/// Read one snapshot of the tasks in `scope` and aggregate it.
pub async fn load_dashboard(
    tasks: &dyn TaskStore,
    scope: &TaskQuery,
    now: DateTime<Utc>,
) -> Result<DashboardData, WorkNestError> {
    let snapshot = tasks.find_tasks(scope).await?;
    tracing::info!("Dashboard snapshot: {} tasks", snapshot.len());
    Ok(summarize(&snapshot, now))
}

/// HTTP Handler: GET /api/tasks/dashboard-data (admin only, enforced by the router)
pub async fn admin_dashboard_handler(tasks: &dyn TaskStore) -> Result<Response<Body>, Error> {
    respond(
        StatusCode::OK,
        load_dashboard(tasks, &TaskQuery::all(), Utc::now()).await,
    )
}

/// HTTP Handler: GET /api/tasks/user-dashboard-data
pub async fn user_dashboard_handler(
    tasks: &dyn TaskStore,
    requester: &User,
) -> Result<Response<Body>, Error> {
    let scope = TaskQuery::assigned_to(requester.user_id.clone());
    respond(
        StatusCode::OK,
        load_dashboard(tasks, &scope, Utc::now()).await,
    )
}
