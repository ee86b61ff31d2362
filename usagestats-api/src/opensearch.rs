//! OpenSearch wire client
//!
//! Thin HTTP adapter implementing the search-engine contract. Queries are
//! dispatched with `allow_no_indices` and `ignore_unavailable` set so that
//! patterns matching zero physical shards come back as empty results rather
//! than hard errors.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use usagestats_core::{SearchEngine, SearchResponse, StatsError, StatsResult};

use crate::config::OpenSearchConfig;

pub struct OpenSearchClient {
    http: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
}

impl OpenSearchClient {
    pub fn new(config: &OpenSearchConfig) -> StatsResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| {
                StatsError::configuration(format!("failed to build search client: {}", err))
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Startup reachability probe; failure here is fatal to the process
    pub async fn ping(&self) -> StatsResult<()> {
        let response = self
            .authorized(self.http.get(&self.endpoint))
            .send()
            .await
            .map_err(|err| {
                StatsError::backend_unavailable(format!("search engine unreachable: {}", err))
            })?;

        if !response.status().is_success() {
            return Err(StatsError::backend_unavailable(format!(
                "search engine answered {} on ping",
                response.status()
            )));
        }
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }
}

#[async_trait]
impl SearchEngine for OpenSearchClient {
    async fn search(&self, body: &Value, index_csv: &str) -> StatsResult<SearchResponse> {
        let url = format!("{}/{}/_search", self.endpoint, index_csv);
        debug!("Searching {}", url);

        let response = self
            .authorized(self.http.post(&url))
            .query(&[("allow_no_indices", "true"), ("ignore_unavailable", "true")])
            .json(body)
            .send()
            .await
            .map_err(|err| {
                StatsError::backend_unavailable(format!("search request failed: {}", err))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Search engine answered {}: {}", status, detail);
            return Err(StatsError::backend_unavailable(format!(
                "search engine answered {}",
                status
            )));
        }

        response.json::<SearchResponse>().await.map_err(|err| {
            StatsError::backend_unavailable(format!("malformed search response: {}", err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let config = OpenSearchConfig {
            endpoint: "http://search.example:9200/".to_string(),
            ..OpenSearchConfig::default()
        };
        let client = OpenSearchClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://search.example:9200");
    }
}
