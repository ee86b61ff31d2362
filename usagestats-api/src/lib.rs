//! Usage Statistics API Service Library
//!
//! This library provides the components of the usage statistics reports
//! service: index resolution over the source registry, report
//! orchestration, the HTTP handlers, and the registry and search-engine
//! adapters.

// Core modules
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod mock;
pub mod opensearch;
pub mod registry_sql;
pub mod report;
pub mod resolver;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use report::ReportOrchestrator;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<report::ReportOrchestrator>,
    pub config: Arc<config::ServiceConfig>,
}

/// Build the service router. Shared between the binary and the integration
/// tests so both exercise the same route table.
pub fn app(state: AppState) -> Router {
    let cors = config::cors_layer(&state.config.cors);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/report/itemWidget", get(handlers::item_widget_handler))
        .route(
            "/report/itemWidgetByCountry",
            get(handlers::item_widget_by_country_handler),
        )
        .route(
            "/report/repositoryWidget",
            get(handlers::repository_widget_handler),
        )
        .route(
            "/report/repositoryWidgetByCountry",
            get(handlers::repository_widget_by_country_handler),
        )
        .route(
            "/report/nationalWidget",
            get(handlers::national_widget_handler),
        )
        .route(
            "/report/nationalWidgetByCountry",
            get(handlers::national_widget_by_country_handler),
        )
        .route(
            "/report/regionalWidget",
            get(handlers::regional_widget_handler),
        )
        .route(
            "/report/regionalWidgetByCountry",
            get(handlers::regional_widget_by_country_handler),
        )
        .route(
            "/report/byLevelActionTime",
            get(handlers::level_action_time_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
