use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::tasks::model::Task;
use crate::tasks::store::{TaskQuery, TaskStore};
use crate::users::model::{Credentials, User};
use crate::users::service::UserStore;

/// In-process store with the same semantics as the DynamoDB layout.
/// Backs tests and local runs.
#[derive(Default)]
pub struct MemoryStore {
    pub tasks: Mutex<HashMap<String, Task>>,
    pub users: Mutex<HashMap<String, User>>,
    pub credentials: Mutex<HashMap<String, Credentials>>,
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .lock()
            .await
            .values()
            .filter(|task| query.matches(task))
            .cloned()
            .collect())
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().await.get(task_id).cloned())
    }

    async fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks
            .lock()
            .await
            .insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), StoreError> {
        self.tasks.lock().await.remove(task_id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().await.get(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().await.values().cloned().collect())
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        self.users
            .lock()
            .await
            .insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        Ok(self.credentials.lock().await.get(email).cloned())
    }

    async fn claim_credentials(&self, credentials: &Credentials) -> Result<bool, StoreError> {
        let mut held = self.credentials.lock().await;
        if held.contains_key(&credentials.email) {
            return Ok(false);
        }
        held.insert(credentials.email.clone(), credentials.clone());
        Ok(true)
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.credentials
            .lock()
            .await
            .insert(credentials.email.clone(), credentials.clone());
        Ok(())
    }

    async fn delete_credentials(&self, email: &str) -> Result<(), StoreError> {
        self.credentials.lock().await.remove(email);
        Ok(())
    }
}
