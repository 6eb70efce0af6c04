use analytics_query_engine::{
    agent::QueryService,
    api::start_server,
    config::EngineConfig,
    context::build_client_store,
    gateway::HttpGateway,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_env()?;

    info!("Analytics Query Engine - API Server");
    info!(port = config.api_port, "Configuration loaded");

    // Create components
    let gateway = Arc::new(HttpGateway::from_config(&config)?);
    info!(gateway = gateway.base_url(), "Tool gateway configured");

    let store = build_client_store(&config);
    let service = Arc::new(QueryService::from_config(&config, gateway, store));

    info!("Query service initialized");

    // Start API server
    start_server(service, config.api_port).await?;

    Ok(())
}
