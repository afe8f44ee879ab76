use lambda_http::{run, service_fn, Error};
use std::sync::Arc;
use worknest_shared::{AppState, Config};

mod http_handler;
use http_handler::function_handler;


#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_http::tracing::init_default_subscriber();

    let config = Config::from_env()?;
    tracing::info!("Starting WorkNest API against table {}", config.table_name);
    let state = Arc::new(AppState::from_aws_env(config).await);

    run(service_fn(move |event| {
        let state = state.clone();
        async move { function_handler(event, state).await }
    }))
    .await
}
