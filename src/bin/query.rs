use analytics_query_engine::{
    agent::QueryService,
    config::EngineConfig,
    context::build_client_store,
    gateway::HttpGateway,
    models::Mode,
};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Run one analytics query against the tool gateway", long_about = None)]
struct Args {
    /// Natural-language query
    query: String,

    /// Client whose data is queried
    #[arg(short, long, env = "CLIENT_ID")]
    client_id: Option<String>,

    /// intelligent, direct or auto
    #[arg(short, long, default_value = "auto")]
    mode: Mode,

    /// Tool for DIRECT mode, or the AUTO fallback
    #[arg(long)]
    fallback_tool: Option<String>,

    /// JSON object passed to the fallback tool
    #[arg(long)]
    fallback_params: Option<String>,

    /// Print the planned strategies without calling the gateway
    #[arg(long)]
    parse_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_env()?;

    let gateway = Arc::new(HttpGateway::from_config(&config)?);
    let store = build_client_store(&config);
    let service = QueryService::from_config(&config, gateway, store);

    if args.parse_only {
        let report = service.test_parse(&args.query);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let client_id = args
        .client_id
        .ok_or("--client-id (or CLIENT_ID) is required")?;

    let fallback_params = args
        .fallback_params
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?;

    info!(client_id = %client_id, mode = args.mode.as_str(), "Running query");

    let result = service
        .query(
            &args.query,
            &client_id,
            args.mode,
            args.fallback_tool.as_deref(),
            fallback_params,
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}
