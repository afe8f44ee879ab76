use chrono::Utc;
use std::collections::HashMap;

use super::model::{
    ChecklistItem, CreateTaskPayload, StatusSummary, Task, TaskListing, TaskStatus, TaskView,
    UpdateTaskPayload,
};
use super::progress::{apply_checklist, apply_status};
use super::store::{TaskQuery, TaskStore};
use crate::error::WorkNestError;
use crate::users::model::{User, UserSummary};
use crate::users::service::{summaries_for, UserStore};

const ASSIGNED_TO_NOT_ARRAY: &str = "assignedTo must be an array of user IDs";

/// `assignedTo` must be a JSON array of string ids.
fn parse_assignees(value: Option<serde_json::Value>) -> Result<Vec<String>, WorkNestError> {
    let Some(serde_json::Value::Array(values)) = value else {
        return Err(WorkNestError::validation(ASSIGNED_TO_NOT_ARRAY));
    };
    values
        .into_iter()
        .map(|v| match v {
            serde_json::Value::String(id) => Ok(id),
            _ => Err(WorkNestError::validation(ASSIGNED_TO_NOT_ARRAY)),
        })
        .collect()
}

fn requester_scope(requester: &User) -> TaskQuery {
    if requester.is_admin() {
        TaskQuery::all()
    } else {
        TaskQuery::assigned_to(requester.user_id.clone())
    }
}

async fn load_task(tasks: &dyn TaskStore, task_id: &str) -> Result<Task, WorkNestError> {
    tasks
        .get_task(task_id)
        .await?
        .ok_or_else(WorkNestError::task_not_found)
}

async fn populate(
    users: &dyn UserStore,
    task: Task,
    cache: &mut HashMap<String, Option<UserSummary>>,
) -> Result<TaskView, WorkNestError> {
    let assignees = summaries_for(users, &task.assigned_to, cache).await?;
    Ok(TaskView::new(task, assignees))
}

/// Tasks visible to `requester` (all for admins, assigned ones otherwise),
/// optionally narrowed by status, plus per-status counts over the same scope.
pub async fn list_tasks(
    tasks: &dyn TaskStore,
    users: &dyn UserStore,
    requester: &User,
    status: Option<TaskStatus>,
) -> Result<TaskListing, WorkNestError> {
    let scope = requester_scope(requester);
    let scoped = tasks.find_tasks(&scope).await?;

    let mut status_summary = StatusSummary {
        all: scoped.len(),
        ..Default::default()
    };
    for task in &scoped {
        match task.status {
            TaskStatus::Pending => status_summary.pending_tasks += 1,
            TaskStatus::InProgress => status_summary.in_progress_tasks += 1,
            TaskStatus::Completed => status_summary.completed_tasks += 1,
        }
    }

    let filter = scope.with_status(status);
    let mut visible: Vec<Task> = scoped.into_iter().filter(|t| filter.matches(t)).collect();
    // Newest first
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut cache = HashMap::new();
    let mut views = Vec::with_capacity(visible.len());
    for task in visible {
        let completed = task.completed_todo_count();
        let mut view = populate(users, task, &mut cache).await?;
        view.completed_todo_count = Some(completed);
        views.push(view);
    }

    Ok(TaskListing {
        tasks: views,
        status_summary,
    })
}

/// Fetch one task with assignees populated. No ownership check is applied.
pub async fn get_task(
    tasks: &dyn TaskStore,
    users: &dyn UserStore,
    task_id: &str,
) -> Result<TaskView, WorkNestError> {
    let task = load_task(tasks, task_id).await?;
    populate(users, task, &mut HashMap::new()).await
}

pub async fn create_task(
    tasks: &dyn TaskStore,
    requester: &User,
    payload: CreateTaskPayload,
) -> Result<Task, WorkNestError> {
    let assigned_to = parse_assignees(payload.assigned_to)?;
    let title = payload
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| WorkNestError::validation("title is required"))?;

    let now = Utc::now();
    let task = Task {
        task_id: uuid::Uuid::new_v4().to_string(),
        title,
        description: payload.description.unwrap_or_default(),
        priority: payload.priority.unwrap_or_default(),
        status: TaskStatus::Pending,
        due_date: payload.due_date,
        assigned_to,
        created_by: requester.user_id.clone(),
        attachments: payload.attachments.unwrap_or_default(),
        todo_checklist: payload.todo_checklist.unwrap_or_default(),
        progress: 0,
        created_at: now,
        updated_at: now,
    };

    tasks.save_task(&task).await?;
    tracing::info!("Task {} created by {}", task.task_id, requester.user_id);
    Ok(task)
}

/// Partial update: every field present in the payload replaces the stored one.
pub async fn update_task(
    tasks: &dyn TaskStore,
    task_id: &str,
    payload: UpdateTaskPayload,
) -> Result<Task, WorkNestError> {
    let mut task = load_task(tasks, task_id).await?;

    if let Some(title) = payload.title {
        task.title = title;
    }
    if let Some(description) = payload.description {
        task.description = description;
    }
    if let Some(priority) = payload.priority {
        task.priority = priority;
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = Some(due_date);
    }
    if let Some(checklist) = payload.todo_checklist {
        task.todo_checklist = checklist;
    }
    if let Some(attachments) = payload.attachments {
        task.attachments = attachments;
    }
    if payload.assigned_to.is_some() {
        task.assigned_to = parse_assignees(payload.assigned_to)?;
    }

    task.updated_at = Utc::now();
    tasks.save_task(&task).await?;
    Ok(task)
}

/// Delete a task. No ownership check is applied.
pub async fn delete_task(tasks: &dyn TaskStore, task_id: &str) -> Result<(), WorkNestError> {
    let task = load_task(tasks, task_id).await?;
    tasks.delete_task(&task.task_id).await?;
    tracing::info!("Task {} deleted", task.task_id);
    Ok(())
}

/// Status transition by an assignee or an admin.
pub async fn update_task_status(
    tasks: &dyn TaskStore,
    task_id: &str,
    status: Option<TaskStatus>,
    requester: &User,
) -> Result<Task, WorkNestError> {
    let mut task = load_task(tasks, task_id).await?;

    if !task.is_assigned_to(&requester.user_id) && !requester.is_admin() {
        return Err(WorkNestError::forbidden("Not authorized"));
    }

    apply_status(&mut task, status);
    task.updated_at = Utc::now();
    tasks.save_task(&task).await?;
    Ok(task)
}

/// Checklist replacement by an assignee or an admin; progress and status are
/// re-derived from the new checklist.
pub async fn update_task_checklist(
    tasks: &dyn TaskStore,
    users: &dyn UserStore,
    task_id: &str,
    checklist: Vec<ChecklistItem>,
    requester: &User,
) -> Result<TaskView, WorkNestError> {
    let mut task = load_task(tasks, task_id).await?;

    if !task.is_assigned_to(&requester.user_id) && !requester.is_admin() {
        return Err(WorkNestError::forbidden("Not authorized to update checklist"));
    }

    apply_checklist(&mut task, checklist);
    task.updated_at = Utc::now();
    tasks.save_task(&task).await?;

    get_task(tasks, users, task_id).await
}
