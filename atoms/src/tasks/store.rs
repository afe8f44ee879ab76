use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use super::model::{ChecklistItem, Task, TaskPriority, TaskStatus};
use crate::dynamo::{
    get_bool, get_n, get_s, get_string_list, get_time, string_list, time, DynamoStore, Item,
};
use crate::error::StoreError;

/// Which tasks a read should return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Only tasks whose `assigned_to` contains this user
    pub assignee: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn assigned_to(user_id: impl Into<String>) -> Self {
        Self {
            assignee: Some(user_id.into()),
            status: None,
        }
    }

    pub fn with_status(mut self, status: Option<TaskStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.assignee
            .as_deref()
            .map_or(true, |user_id| task.is_assigned_to(user_id))
            && self.status.map_or(true, |status| task.status == status)
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError>;

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError>;

    /// Insert or fully replace a task.
    async fn save_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn delete_task(&self, task_id: &str) -> Result<(), StoreError>;
}

const TASK_PK: &str = "TASK";

#[async_trait]
impl TaskStore for DynamoStore {
    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let mut filters = vec![];
        let mut expr_names = HashMap::new();
        let mut expr_values = HashMap::new();
        expr_values.insert(":pk".to_string(), AttributeValue::S(TASK_PK.to_string()));
        expr_values.insert(":sk_prefix".to_string(), AttributeValue::S("TASK#".to_string()));

        if let Some(user_id) = &query.assignee {
            filters.push("contains(assigned_to, :assignee)");
            expr_values.insert(":assignee".to_string(), AttributeValue::S(user_id.clone()));
        }

        if let Some(status) = query.status {
            // "status" is a DynamoDB reserved word
            filters.push("#status = :status");
            expr_names.insert("#status".to_string(), "status".to_string());
            expr_values.insert(":status".to_string(), AttributeValue::S(status.as_str().to_string()));
        }

        let filter_expression = (!filters.is_empty()).then(|| filters.join(" AND "));
        let expr_names = (!expr_names.is_empty()).then_some(expr_names);

        let mut tasks = Vec::new();
        let mut start_key = None;
        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .set_filter_expression(filter_expression.clone())
                .set_expression_attribute_names(expr_names.clone())
                .set_expression_attribute_values(Some(expr_values.clone()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| StoreError(format!("DynamoDB query error: {}", e)))?;

            for item in result.items() {
                if let Some(task) = task_from_item(item) {
                    tasks.push(task);
                }
            }

            match result.last_evaluated_key() {
                Some(key) => start_key = Some(key.clone()),
                None => break,
            }
        }

        Ok(tasks)
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(TASK_PK.to_string()))
            .key("SK", AttributeValue::S(format!("TASK#{}", task_id)))
            .send()
            .await
            .map_err(|e| StoreError(format!("DynamoDB get_item error: {}", e)))?;

        Ok(result.item().and_then(task_from_item))
    }

    async fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(TASK_PK.to_string()))
            .item("SK", AttributeValue::S(format!("TASK#{}", task.task_id)))
            .item("title", AttributeValue::S(task.title.clone()))
            .item("description", AttributeValue::S(task.description.clone()))
            .item("priority", AttributeValue::S(task.priority.as_str().to_string()))
            .item("status", AttributeValue::S(task.status.as_str().to_string()))
            .item("assigned_to", string_list(&task.assigned_to))
            .item("created_by", AttributeValue::S(task.created_by.clone()))
            .item("attachments", string_list(&task.attachments))
            .item("todo_checklist", checklist_value(&task.todo_checklist))
            .item("progress", AttributeValue::N(task.progress.to_string()))
            .item("created_at", time(&task.created_at))
            .item("updated_at", time(&task.updated_at));

        if let Some(due_date) = &task.due_date {
            builder = builder.item("due_date", time(due_date));
        }

        builder
            .send()
            .await
            .map_err(|e| StoreError(format!("DynamoDB put_item error: {}", e)))?;
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(TASK_PK.to_string()))
            .key("SK", AttributeValue::S(format!("TASK#{}", task_id)))
            .send()
            .await
            .map_err(|e| StoreError(format!("DynamoDB delete_item error: {}", e)))?;
        Ok(())
    }
}

fn task_from_item(item: &Item) -> Option<Task> {
    let sk = get_s(item, "SK")?;
    let task_id = sk.strip_prefix("TASK#")?.to_string();
    let created_at = get_time(item, "created_at").unwrap_or_default();

    Some(Task {
        task_id,
        title: get_s(item, "title").unwrap_or_default(),
        description: get_s(item, "description").unwrap_or_default(),
        priority: get_s(item, "priority")
            .and_then(|p| TaskPriority::parse(&p))
            .unwrap_or_default(),
        status: get_s(item, "status")
            .and_then(|s| TaskStatus::parse(&s))
            .unwrap_or_default(),
        due_date: get_time(item, "due_date"),
        assigned_to: get_string_list(item, "assigned_to"),
        created_by: get_s(item, "created_by").unwrap_or_default(),
        attachments: get_string_list(item, "attachments"),
        todo_checklist: checklist_from_item(item),
        progress: get_n(item, "progress").unwrap_or(0),
        created_at,
        updated_at: get_time(item, "updated_at").unwrap_or(created_at),
    })
}

fn checklist_value(checklist: &[ChecklistItem]) -> AttributeValue {
    AttributeValue::L(
        checklist
            .iter()
            .map(|entry| {
                AttributeValue::M(HashMap::from([
                    ("text".to_string(), AttributeValue::S(entry.text.clone())),
                    ("completed".to_string(), AttributeValue::Bool(entry.completed)),
                ]))
            })
            .collect(),
    )
}

fn checklist_from_item(item: &Item) -> Vec<ChecklistItem> {
    item.get("todo_checklist")
        .and_then(|v| v.as_l().ok())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_m().ok())
                .map(|entry| ChecklistItem {
                    text: get_s(entry, "text").unwrap_or_default(),
                    completed: get_bool(entry, "completed").unwrap_or(false),
                })
                .collect()
        })
        .unwrap_or_default()
}
