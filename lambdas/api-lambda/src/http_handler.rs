use dashboard_block as dashboard;
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;
use worknest_atoms::{tasks, users};
use worknest_shared::{auth, AppState};

use lambda_http::http::header::{HeaderValue, VARY};

fn with_cors_headers(mut resp: Response<Body>, client_url: &str) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(client_url).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));

    resp
}

fn finalize_response(
    resp: Result<Response<Body>, Error>,
    client_url: &str,
) -> Result<Response<Body>, Error> {
    resp.map(|r| with_cors_headers(r, client_url))
}

/// Main Lambda handler - serves session routes, authenticates the caller and routes `/api/*` requests
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    let client_url = state.config.client_url.as_str();
    tracing::info!("WorkNest API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp, client_url));
    }

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if !matches!(
        parts.as_slice(),
        ["api", "tasks", ..] | ["api", "users", ..] | ["api", "auth", ..]
    ) {
        tracing::warn!("No route matched - Method: {} Path: {}", method, path);
        return finalize_response(not_found(), client_url);
    }

    // Session routes (no token required)
    match (method, parts.as_slice()) {
        (&Method::POST, ["api", "auth", "register"]) => {
            return finalize_response(
                auth::register_handler(state.users.as_ref(), &state.config, body).await,
                client_url,
            );
        }
        (&Method::POST, ["api", "auth", "login"]) => {
            return finalize_response(
                auth::login_handler(state.users.as_ref(), &state.config, body).await,
                client_url,
            );
        }
        _ => {}
    }

    // Every API route requires a bearer token
    let authorization = event
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());
    let auth_ctx = match auth::authenticate_bearer_request(
        state.users.as_ref(),
        &state.config.jwt_secret,
        authorization,
    )
    .await
    {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(with_cors_headers(resp, client_url)),
    };

    let task_store = state.tasks.as_ref();
    let user_store = state.users.as_ref();
    let requester = &auth_ctx.user;

    let resp = match (method, parts.as_slice()) {
        // --- DASHBOARDS ---
        // GET /api/tasks/dashboard-data - global statistics (admin only)
        (&Method::GET, ["api", "tasks", "dashboard-data"]) => match auth::require_admin(&auth_ctx) {
            Ok(()) => dashboard::admin_dashboard_handler(task_store).await,
            Err(resp) => Ok(resp),
        },
        // GET /api/tasks/user-dashboard-data - statistics for the caller's tasks
        (&Method::GET, ["api", "tasks", "user-dashboard-data"]) => {
            dashboard::user_dashboard_handler(task_store, requester).await
        }

        // --- TASKS ---
        // GET /api/tasks - list tasks + status summary
        (&Method::GET, ["api", "tasks"]) => {
            let status = event
                .query_string_parameters_ref()
                .and_then(|params| params.first("status"));
            tasks::list_tasks_handler(task_store, user_store, requester, status).await
        }
        // POST /api/tasks - create task
        (&Method::POST, ["api", "tasks"]) => {
            tasks::create_task_handler(task_store, requester, body).await
        }
        // GET /api/tasks/{id} - get task
        (&Method::GET, ["api", "tasks", task_id]) => {
            tasks::get_task_handler(task_store, user_store, task_id).await
        }
        // PUT /api/tasks/{id} - update task
        (&Method::PUT, ["api", "tasks", task_id]) => {
            tasks::update_task_handler(task_store, task_id, body).await
        }
        // DELETE /api/tasks/{id} - delete task
        (&Method::DELETE, ["api", "tasks", task_id]) => {
            tasks::delete_task_handler(task_store, task_id).await
        }
        // PUT /api/tasks/{id}/status - status transition (assignee or admin)
        (&Method::PUT, ["api", "tasks", task_id, "status"]) => {
            tasks::update_task_status_handler(task_store, requester, task_id, body).await
        }
        // PUT /api/tasks/{id}/todo - replace checklist (assignee or admin)
        (&Method::PUT, ["api", "tasks", task_id, "todo"]) => {
            tasks::update_task_checklist_handler(task_store, user_store, requester, task_id, body)
                .await
        }

        // --- PROFILE ---
        // GET /api/auth/profile - caller's profile
        (&Method::GET, ["api", "auth", "profile"]) => {
            users::me_handler(user_store, auth_ctx.user_id()).await
        }
        // PUT /api/auth/profile - update caller's profile, returns a fresh token
        (&Method::PUT, ["api", "auth", "profile"]) => {
            auth::update_profile_handler(user_store, &state.config, &auth_ctx, body).await
        }

        // --- USERS ---
        // GET /api/users - members with task counts (admin only)
        (&Method::GET, ["api", "users"]) => match auth::require_admin(&auth_ctx) {
            Ok(()) => users::list_users_handler(user_store, task_store).await,
            Err(resp) => Ok(resp),
        },
        // GET /api/users/me - caller's profile
        (&Method::GET, ["api", "users", "me"]) => {
            users::me_handler(user_store, auth_ctx.user_id()).await
        }
        // GET /api/users/{id} - user by id
        (&Method::GET, ["api", "users", user_id]) => {
            users::get_user_handler(user_store, user_id).await
        }

        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    };

    finalize_response(resp, client_url)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"message": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}
