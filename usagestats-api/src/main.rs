use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use usagestats_api::{
    app, config::ServiceConfig, opensearch::OpenSearchClient, registry_sql::PostgresRegistry,
    report::ReportOrchestrator, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Arc::new(ServiceConfig::load()?);
    config.validate()?;
    info!("Loaded configuration: {:?}", config);

    // Connections are acquired once and shared for the process lifetime; an
    // unreachable collaborator at boot is fatal, nothing at request time is.
    let registry = Arc::new(PostgresRegistry::connect(&config.registry).await?);
    info!("Connected to source registry");

    let search = Arc::new(OpenSearchClient::new(&config.opensearch)?);
    search.ping().await?;
    info!("Search engine reachable at {}", config.opensearch.endpoint);

    let orchestrator = Arc::new(ReportOrchestrator::new(registry, search));

    let state = AppState {
        orchestrator,
        config: config.clone(),
    };

    // Start server
    let listener = TcpListener::bind(&config.bind_address).await?;
    let addr = listener.local_addr()?;
    info!("Usage Statistics API listening on {}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
