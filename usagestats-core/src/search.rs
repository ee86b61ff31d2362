//! Search engine contract
//!
//! The search engine executes the aggregation queries this service builds.
//! Implementations dispatch against a comma-separated list of index-name
//! patterns and must tolerate patterns matching zero physical indices
//! without raising a hard error: the usage-stats namespace is time-sharded
//! and some shards legitimately never existed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::StatsResult;

/// The slice of a search response the report service cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// The aggregation payload, absent when the engine computed none
    #[serde(default)]
    pub aggregations: Option<Value>,
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Execute an aggregation query against the given index patterns.
    ///
    /// Transport failures and malformed responses surface as
    /// `StatsError::BackendUnavailable`; missing indices do not.
    async fn search(&self, body: &Value, index_csv: &str) -> StatsResult<SearchResponse>;
}
