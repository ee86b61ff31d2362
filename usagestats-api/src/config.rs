//! Configuration for the usage statistics service

use anyhow::Result;
use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::env;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Configuration for the reports service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Search engine configuration
    pub opensearch: OpenSearchConfig,

    /// Source registry configuration
    pub registry: RegistryConfig,

    /// Cross-origin configuration
    pub cors: CorsConfig,

    /// Report defaults and limits
    pub report: ReportConfig,
}

/// Search engine connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSearchConfig {
    /// Base URL of the search engine
    pub endpoint: String,

    /// Username for basic authentication
    pub username: Option<String>,

    /// Password for basic authentication
    pub password: Option<String>,

    /// Outbound request timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// Source registry connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// Connection acquire timeout in milliseconds
    pub connect_timeout_ms: u64,
}

/// Cross-origin resource sharing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; a single `*` entry allows any origin
    pub allowed_origins: Vec<String>,
}

/// Report defaults and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Country buckets per measure when the caller omits `limit`
    pub default_limit: usize,

    /// Upper bound on the caller-supplied `limit`
    pub max_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            opensearch: OpenSearchConfig::default(),
            registry: RegistryConfig::default(),
            cors: CorsConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9200".to_string(),
            username: None,
            password: None,
            request_timeout_ms: 30_000,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/usagestats".to_string(),
            max_connections: 10,
            connect_timeout_ms: 5_000,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables and defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(bind_addr) = env::var("USAGESTATS_BIND_ADDRESS") {
            config.bind_address = bind_addr;
        }

        if let Ok(endpoint) = env::var("USAGESTATS_OPENSEARCH_ENDPOINT") {
            config.opensearch.endpoint = endpoint;
        }

        if let Ok(username) = env::var("USAGESTATS_OPENSEARCH_USERNAME") {
            config.opensearch.username = Some(username);
        }

        if let Ok(password) = env::var("USAGESTATS_OPENSEARCH_PASSWORD") {
            config.opensearch.password = Some(password);
        }

        if let Ok(timeout) = env::var("USAGESTATS_OPENSEARCH_TIMEOUT_MS") {
            config.opensearch.request_timeout_ms = timeout.parse()?;
        }

        if let Ok(database_url) = env::var("USAGESTATS_REGISTRY_URL") {
            config.registry.database_url = database_url;
        }

        if let Ok(max_connections) = env::var("USAGESTATS_REGISTRY_MAX_CONNECTIONS") {
            config.registry.max_connections = max_connections.parse()?;
        }

        if let Ok(origins) = env::var("USAGESTATS_CORS_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(limit) = env::var("USAGESTATS_REPORT_DEFAULT_LIMIT") {
            config.report.default_limit = limit.parse()?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.is_empty() {
            return Err(anyhow::anyhow!("Bind address cannot be empty"));
        }

        if self.opensearch.endpoint.is_empty() {
            return Err(anyhow::anyhow!("Search engine endpoint cannot be empty"));
        }

        if self.registry.database_url.is_empty() {
            return Err(anyhow::anyhow!("Registry database URL cannot be empty"));
        }

        if self.registry.max_connections == 0 {
            return Err(anyhow::anyhow!("Registry pool needs at least one connection"));
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(anyhow::anyhow!("At least one CORS origin is required"));
        }

        if self.report.default_limit == 0 || self.report.default_limit > self.report.max_limit {
            return Err(anyhow::anyhow!(
                "Default report limit must be between 1 and {}",
                self.report.max_limit
            ));
        }

        Ok(())
    }
}

/// Build the CORS layer from configuration. A `*` entry means permissive;
/// otherwise only the listed origins are allowed. Unparseable origins are
/// skipped with a warning rather than taking the service down.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Skipping unparseable CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_limit_bounds_are_checked() {
        let mut config = ServiceConfig::default();
        config.report.default_limit = 0;
        assert!(config.validate().is_err());

        config.report.default_limit = config.report.max_limit + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_origin_list_is_rejected() {
        let mut config = ServiceConfig::default();
        config.cors.allowed_origins.clear();
        assert!(config.validate().is_err());
    }
}
