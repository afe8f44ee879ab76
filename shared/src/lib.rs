pub mod auth;
pub mod config;

use aws_sdk_dynamodb::Client as DynamoClient;
use std::sync::Arc;
use worknest_atoms::tasks::TaskStore;
use worknest_atoms::users::UserStore;
use worknest_atoms::{DynamoStore, MemoryStore};

pub use config::Config;

/// Per-process state shared by every invocation.
pub struct AppState {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
    pub config: Config,
}

impl AppState {
    pub fn with_dynamo(client: DynamoClient, config: Config) -> Self {
        let store = Arc::new(DynamoStore::new(client, config.table_name.clone()));
        Self {
            tasks: store.clone(),
            users: store,
            config,
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>, config: Config) -> Self {
        Self {
            tasks: store.clone(),
            users: store,
            config,
        }
    }

    /// Load AWS configuration from the environment and build a DynamoDB-backed state.
    pub async fn from_aws_env(config: Config) -> Self {
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::with_dynamo(DynamoClient::new(&aws), config)
    }
}
