use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

use super::model::{
    CreateTaskPayload, Task, TaskStatus, TaskView, UpdateChecklistPayload, UpdateStatusPayload,
    UpdateTaskPayload,
};
use super::service;
use super::store::TaskStore;
use crate::error::WorkNestError;
use crate::response::{parse_body, respond};
use crate::users::model::User;
use crate::users::service::UserStore;

#[derive(Serialize)]
struct TaskMessage<T: Serialize> {
    message: &'static str,
    task: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedTaskMessage {
    message: &'static str,
    updated_task: Task,
}

#[derive(Serialize)]
struct Message {
    message: &'static str,
}

/// GET /api/tasks?status=...
pub async fn list_tasks_handler(
    tasks: &dyn TaskStore,
    users: &dyn UserStore,
    requester: &User,
    status: Option<&str>,
) -> Result<Response<Body>, Error> {
    let status = match status.filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match TaskStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return WorkNestError::validation(format!("Unknown task status: {}", raw))
                    .into_response()
            }
        },
    };

    respond(
        StatusCode::OK,
        service::list_tasks(tasks, users, requester, status).await,
    )
}

/// GET /api/tasks/{id}
pub async fn get_task_handler(
    tasks: &dyn TaskStore,
    users: &dyn UserStore,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    respond(
        StatusCode::OK,
        service::get_task(tasks, users, task_id).await,
    )
}

/// POST /api/tasks
pub async fn create_task_handler(
    tasks: &dyn TaskStore,
    requester: &User,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: CreateTaskPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let result = service::create_task(tasks, requester, payload)
        .await
        .map(|task| TaskMessage {
            message: "Task created successfully",
            task,
        });
    respond(StatusCode::CREATED, result)
}

/// PUT /api/tasks/{id}
pub async fn update_task_handler(
    tasks: &dyn TaskStore,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UpdateTaskPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let result = service::update_task(tasks, task_id, payload)
        .await
        .map(|updated_task| UpdatedTaskMessage {
            message: "Task updated successfully",
            updated_task,
        });
    respond(StatusCode::OK, result)
}

/// DELETE /api/tasks/{id}
pub async fn delete_task_handler(
    tasks: &dyn TaskStore,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    let result = service::delete_task(tasks, task_id).await.map(|_| Message {
        message: "Task deleted successfully",
    });
    respond(StatusCode::OK, result)
}

/// PUT /api/tasks/{id}/status
pub async fn update_task_status_handler(
    tasks: &dyn TaskStore,
    requester: &User,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UpdateStatusPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let result = service::update_task_status(tasks, task_id, payload.status, requester)
        .await
        .map(|task| TaskMessage {
            message: "Task status updated",
            task,
        });
    respond(StatusCode::OK, result)
}

/// PUT /api/tasks/{id}/todo
pub async fn update_task_checklist_handler(
    tasks: &dyn TaskStore,
    users: &dyn UserStore,
    requester: &User,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UpdateChecklistPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let result: Result<TaskMessage<TaskView>, _> =
        service::update_task_checklist(tasks, users, task_id, payload.todo_checklist, requester)
            .await
            .map(|task| TaskMessage {
                message: "Task checklist updated",
                task,
            });
    respond(StatusCode::OK, result)
}
