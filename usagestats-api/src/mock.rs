//! In-memory collaborator doubles for unit and integration testing
//!
//! These implement the registry and search-engine contracts without
//! requiring a PostgreSQL instance or a search cluster. The registry double
//! derives index patterns from its in-memory hierarchy exactly the way the
//! SQL adapter derives them from rows.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use usagestats_core::{
    ResolvedIndexSet, SearchEngine, SearchResponse, Source, SourceRegistry, SourceType,
    StatsError, StatsResult,
};

/// In-memory source registry
#[derive(Debug, Default)]
pub struct MockRegistry {
    sources: HashMap<String, Source>,
    children: HashMap<String, Vec<String>>,
    empty_subtrees: bool,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, optionally under a parent
    pub fn with_source(mut self, source: Source, parent: Option<&str>) -> Self {
        if let Some(parent) = parent {
            self.children
                .entry(parent.to_string())
                .or_default()
                .push(source.id.clone());
        }
        self.sources.insert(source.id.clone(), source);
        self
    }

    /// Make aggregator subtree resolution come back empty, to exercise the
    /// terminal not-found branch
    pub fn with_empty_subtrees(mut self) -> Self {
        self.empty_subtrees = true;
        self
    }

    /// A small three-tier hierarchy: one regional aggregator, two national
    /// aggregators, one repository under each
    pub fn with_demo_hierarchy() -> Self {
        Self::new()
            .with_source(
                Source::new("lareferencia::oai", SourceType::Regional, "00"),
                None,
            )
            .with_source(
                Source::new("peru::national", SourceType::National, "PE"),
                Some("lareferencia::oai"),
            )
            .with_source(
                Source::new("concytec", SourceType::Repository, "PE")
                    .with_identifier_prefix("oai:repositorio.concytec.gob.pe:"),
                Some("peru::national"),
            )
            .with_source(
                Source::new("brasil::ibict", SourceType::National, "BR"),
                Some("lareferencia::oai"),
            )
            .with_source(
                Source::new("scielo::br", SourceType::Repository, "BR")
                    .with_identifier_prefix("oai:scielo.br:"),
                Some("brasil::ibict"),
            )
    }

    /// Direct access for test setup
    pub fn source(&self, id: &str) -> Option<Source> {
        self.sources.get(id).cloned()
    }

    fn child_sources(&self, id: &str) -> Vec<&Source> {
        self.children
            .get(id)
            .map(|ids| ids.iter().filter_map(|id| self.sources.get(id)).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SourceRegistry for MockRegistry {
    async fn source_by_id(&self, id: &str) -> StatsResult<Option<Source>> {
        Ok(self.sources.get(id).cloned())
    }

    async fn index_patterns_for_identifier_prefix(
        &self,
        prefix: &str,
    ) -> StatsResult<Option<ResolvedIndexSet>> {
        let repository = self.sources.values().find(|s| {
            s.kind == SourceType::Repository && s.identifier_prefix.as_deref() == Some(prefix)
        });
        Ok(repository.map(|s| ResolvedIndexSet::of(s.index_pattern())))
    }

    async fn index_patterns_for_national_source(
        &self,
        source: &Source,
    ) -> StatsResult<ResolvedIndexSet> {
        if self.empty_subtrees {
            return Ok(ResolvedIndexSet::new());
        }
        let mut set = ResolvedIndexSet::of(source.index_pattern());
        for repository in self.child_sources(&source.id) {
            set.insert(repository.index_pattern());
        }
        Ok(set)
    }

    async fn index_patterns_for_regional_source(
        &self,
        source: &Source,
    ) -> StatsResult<ResolvedIndexSet> {
        if self.empty_subtrees {
            return Ok(ResolvedIndexSet::new());
        }
        let mut set = ResolvedIndexSet::of(source.index_pattern());
        for national in self.child_sources(&source.id) {
            set.insert(national.index_pattern());
            for repository in self.child_sources(&national.id) {
                set.insert(repository.index_pattern());
            }
        }
        Ok(set)
    }
}

/// One recorded search dispatch
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub index_csv: String,
    pub body: Value,
}

/// In-memory search engine that records every dispatch
#[derive(Debug)]
pub struct MockSearchEngine {
    requests: Mutex<Vec<RecordedSearch>>,
    aggregations: Option<Value>,
    simulate_errors: AtomicBool,
}

impl MockSearchEngine {
    /// A mock answering every query with a small canned aggregation payload
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            aggregations: Some(json!({
                "views": { "value": 42.0 },
                "downloads": { "value": 17.0 },
                "conversions": { "value": 3.0 },
                "outlinks": { "value": 1.0 }
            })),
            simulate_errors: AtomicBool::new(false),
        }
    }

    /// Answer with a specific aggregation payload
    pub fn with_aggregations(aggregations: Value) -> Self {
        Self {
            aggregations: Some(aggregations),
            ..Self::new()
        }
    }

    /// Answer with a response that carries no aggregations section
    pub fn without_aggregations() -> Self {
        Self {
            aggregations: None,
            ..Self::new()
        }
    }

    /// Fail every search with a transport error
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.simulate_errors.store(true, Ordering::Relaxed);
        mock
    }

    /// Everything dispatched so far
    pub fn requests(&self) -> Vec<RecordedSearch> {
        self.requests.lock().expect("mock lock poisoned").clone()
    }
}

impl Default for MockSearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchEngine for MockSearchEngine {
    async fn search(&self, body: &Value, index_csv: &str) -> StatsResult<SearchResponse> {
        self.requests
            .lock()
            .expect("mock lock poisoned")
            .push(RecordedSearch {
                index_csv: index_csv.to_string(),
                body: body.clone(),
            });

        if self.simulate_errors.load(Ordering::Relaxed) {
            return Err(StatsError::backend_unavailable(
                "simulated transport failure",
            ));
        }

        Ok(SearchResponse {
            aggregations: self.aggregations.clone(),
        })
    }
}
