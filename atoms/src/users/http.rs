use lambda_http::{http::StatusCode, Body, Error, Response};

use super::service::{self, UserStore};
use crate::response::respond;
use crate::tasks::store::TaskStore;

/// GET /api/users/me and GET /api/auth/profile
pub async fn me_handler(users: &dyn UserStore, user_id: &str) -> Result<Response<Body>, Error> {
    respond(StatusCode::OK, service::get_profile(users, user_id).await)
}

/// GET /api/users (admin only, enforced by the router)
pub async fn list_users_handler(
    users: &dyn UserStore,
    tasks: &dyn TaskStore,
) -> Result<Response<Body>, Error> {
    respond(
        StatusCode::OK,
        service::list_members_with_task_counts(users, tasks).await,
    )
}

/// GET /api/users/{id}
pub async fn get_user_handler(
    users: &dyn UserStore,
    user_id: &str,
) -> Result<Response<Body>, Error> {
    respond(StatusCode::OK, service::get_profile(users, user_id).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn unknown_users_are_not_found() {
        let store = MemoryStore::default();
        for resp in [
            me_handler(&store, "nobody").await.unwrap(),
            get_user_handler(&store, "nobody").await.unwrap(),
        ] {
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
            assert_eq!(body["message"], "User not found");
        }
    }

    #[tokio::test]
    async fn empty_directory_lists_no_members() {
        let store = MemoryStore::default();
        let resp = list_users_handler(&store, &store).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(&resp.body()[..], b"[]");
    }
}
