use async_trait::async_trait;
use aws_sdk_dynamodb::operation::put_item::builders::PutItemFluentBuilder;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use super::model::{Credentials, User, UserRole, UserSummary, UserWithTaskCounts};
use crate::dynamo::{get_s, get_time, time, DynamoStore, Item};
use crate::error::{StoreError, WorkNestError};
use crate::tasks::model::TaskStatus;
use crate::tasks::store::{TaskQuery, TaskStore};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn put_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError>;

    /// Store credentials for an email nobody holds yet. Returns false when
    /// the email is already taken.
    async fn claim_credentials(&self, credentials: &Credentials) -> Result<bool, StoreError>;

    /// Insert or replace credentials for an email.
    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError>;

    async fn delete_credentials(&self, email: &str) -> Result<(), StoreError>;
}

const USER_PK: &str = "USER";
const CREDENTIALS_PK: &str = "CREDENTIALS";

#[async_trait]
impl UserStore for DynamoStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(USER_PK.to_string()))
            .key("SK", AttributeValue::S(format!("USER#{}", user_id)))
            .send()
            .await
            .map_err(|e| StoreError(format!("DynamoDB get_item error: {}", e)))?;

        Ok(result.item().and_then(user_from_item))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = Vec::new();
        let mut start_key = None;
        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(USER_PK.to_string()))
                .expression_attribute_values(":sk_prefix", AttributeValue::S("USER#".to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| StoreError(format!("DynamoDB query error: {}", e)))?;

            users.extend(result.items().iter().filter_map(user_from_item));

            match result.last_evaluated_key() {
                Some(key) => start_key = Some(key.clone()),
                None => break,
            }
        }
        Ok(users)
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        let mut builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(USER_PK.to_string()))
            .item("SK", AttributeValue::S(format!("USER#{}", user.user_id)))
            .item("name", AttributeValue::S(user.name.clone()))
            .item("email", AttributeValue::S(user.email.clone()))
            .item("role", AttributeValue::S(user.role.as_str().to_string()))
            .item("created_at", time(&user.created_at));

        if let Some(url) = &user.profile_image_url {
            builder = builder.item("profile_image_url", AttributeValue::S(url.clone()));
        }

        builder
            .send()
            .await
            .map_err(|e| StoreError(format!("DynamoDB put_item error: {}", e)))?;
        Ok(())
    }

    async fn get_credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(CREDENTIALS_PK.to_string()))
            .key("SK", AttributeValue::S(format!("EMAIL#{}", email)))
            .send()
            .await
            .map_err(|e| StoreError(format!("DynamoDB get_item error: {}", e)))?;

        Ok(result.item().and_then(|item| {
            Some(Credentials {
                email: email.to_string(),
                user_id: get_s(item, "user_id")?,
                password_hash: get_s(item, "password_hash")?,
            })
        }))
    }

    async fn claim_credentials(&self, credentials: &Credentials) -> Result<bool, StoreError> {
        let result = self
            .credentials_put(credentials)
            .condition_expression("attribute_not_exists(SK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Ok(false)
            }
            Err(e) => Err(StoreError(format!("DynamoDB put_item error: {}", e))),
        }
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.credentials_put(credentials)
            .send()
            .await
            .map_err(|e| StoreError(format!("DynamoDB put_item error: {}", e)))?;
        Ok(())
    }

    async fn delete_credentials(&self, email: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(CREDENTIALS_PK.to_string()))
            .key("SK", AttributeValue::S(format!("EMAIL#{}", email)))
            .send()
            .await
            .map_err(|e| StoreError(format!("DynamoDB delete_item error: {}", e)))?;
        Ok(())
    }
}

impl DynamoStore {
    fn credentials_put(&self, credentials: &Credentials) -> PutItemFluentBuilder {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(CREDENTIALS_PK.to_string()))
            .item("SK", AttributeValue::S(format!("EMAIL#{}", credentials.email)))
            .item("user_id", AttributeValue::S(credentials.user_id.clone()))
            .item("password_hash", AttributeValue::S(credentials.password_hash.clone()))
    }
}

fn user_from_item(item: &Item) -> Option<User> {
    let user_id = get_s(item, "SK")?.strip_prefix("USER#")?.to_string();
    let email = get_s(item, "email").unwrap_or_default();
    let mut name = get_s(item, "name").unwrap_or_default();
    if name.trim().is_empty() {
        name = email.split('@').next().unwrap_or("User").to_string();
    }

    Some(User {
        user_id,
        name,
        email,
        role: get_s(item, "role")
            .and_then(|r| UserRole::parse(&r))
            .unwrap_or_default(),
        profile_image_url: get_s(item, "profile_image_url"),
        created_at: get_time(item, "created_at").unwrap_or_default(),
    })
}

/// Resolve assignee ids to summaries, preserving order and dropping ids
/// that no longer resolve to a user. Each distinct id is looked up once.
pub async fn summaries_for(
    users: &dyn UserStore,
    user_ids: &[String],
    cache: &mut HashMap<String, Option<UserSummary>>,
) -> Result<Vec<UserSummary>, StoreError> {
    let mut summaries = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        if !cache.contains_key(user_id) {
            let found = users.get_user(user_id).await?;
            cache.insert(user_id.clone(), found.as_ref().map(UserSummary::from));
        }
        if let Some(Some(summary)) = cache.get(user_id) {
            summaries.push(summary.clone());
        }
    }
    Ok(summaries)
}

/// Load a user's profile by id.
pub async fn get_profile(users: &dyn UserStore, user_id: &str) -> Result<User, WorkNestError> {
    users
        .get_user(user_id)
        .await?
        .ok_or_else(WorkNestError::user_not_found)
}

/// Members with per-status counts of the tasks assigned to them, counted
/// from one task snapshot.
pub async fn list_members_with_task_counts(
    users: &dyn UserStore,
    tasks: &dyn TaskStore,
) -> Result<Vec<UserWithTaskCounts>, WorkNestError> {
    let mut members: Vec<User> = users
        .list_users()
        .await?
        .into_iter()
        .filter(|user| user.role == UserRole::Member)
        .collect();
    members.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let snapshot = tasks.find_tasks(&TaskQuery::all()).await?;
    Ok(members
        .into_iter()
        .map(|user| {
            let count = |status: TaskStatus| {
                snapshot
                    .iter()
                    .filter(|t| t.status == status && t.is_assigned_to(&user.user_id))
                    .count()
            };
            UserWithTaskCounts {
                pending_tasks: count(TaskStatus::Pending),
                in_progress_tasks: count(TaskStatus::InProgress),
                completed_tasks: count(TaskStatus::Completed),
                user,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;

    fn user(id: &str, name: &str) -> User {
        User {
            user_id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@worknest.test", id),
            role: UserRole::Member,
            profile_image_url: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn summaries_skip_unknown_ids_and_keep_order() {
        let store = MemoryStore::default();
        store.put_user(&user("u2", "Bea")).await.unwrap();
        store.put_user(&user("u1", "Ari")).await.unwrap();

        let ids = vec!["u1".to_string(), "ghost".to_string(), "u2".to_string()];
        let mut cache = HashMap::new();
        let summaries = summaries_for(&store, &ids, &mut cache).await.unwrap();

        let names: Vec<_> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Ari", "Bea"]);
        assert_eq!(cache.get("ghost"), Some(&None));
    }

    #[tokio::test]
    async fn member_listing_counts_assigned_tasks_by_status() {
        use crate::tasks::model::Task;

        let store = MemoryStore::default();
        store.put_user(&user("u1", "Ari")).await.unwrap();
        store.put_user(&user("u2", "Bea")).await.unwrap();
        let mut boss = user("boss", "Boss");
        boss.role = UserRole::Admin;
        store.put_user(&boss).await.unwrap();

        let now = Utc::now();
        for (id, status, assignees) in [
            ("t1", TaskStatus::Pending, vec!["u1"]),
            ("t2", TaskStatus::Pending, vec!["u1", "u2"]),
            ("t3", TaskStatus::InProgress, vec!["u1"]),
            ("t4", TaskStatus::Completed, vec!["u2", "boss"]),
        ] {
            let task = Task {
                task_id: id.to_string(),
                title: id.to_string(),
                description: String::new(),
                priority: Default::default(),
                status,
                due_date: None,
                assigned_to: assignees.into_iter().map(String::from).collect(),
                created_by: "boss".to_string(),
                attachments: vec![],
                todo_checklist: vec![],
                progress: 0,
                created_at: now,
                updated_at: now,
            };
            store.save_task(&task).await.unwrap();
        }

        let rows = list_members_with_task_counts(&store, &store).await.unwrap();
        let mut counts: Vec<_> = rows
            .iter()
            .map(|r| {
                (
                    r.user.user_id.as_str(),
                    r.pending_tasks,
                    r.in_progress_tasks,
                    r.completed_tasks,
                )
            })
            .collect();
        counts.sort();
        assert_eq!(counts, [("u1", 2, 1, 0), ("u2", 1, 0, 1)]);
    }

    #[tokio::test]
    async fn claiming_a_taken_email_fails() {
        let store = MemoryStore::default();
        let credentials = Credentials {
            email: "ari@worknest.test".to_string(),
            user_id: "u1".to_string(),
            password_hash: "h1".to_string(),
        };
        assert!(store.claim_credentials(&credentials).await.unwrap());

        let rival = Credentials {
            user_id: "u2".to_string(),
            ..credentials.clone()
        };
        assert!(!store.claim_credentials(&rival).await.unwrap());
        assert_eq!(
            store.get_credentials("ari@worknest.test").await.unwrap(),
            Some(credentials)
        );
    }
}
