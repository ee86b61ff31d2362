//! Report orchestration
//!
//! One parametrized algorithm serves every report type: resolve the acting
//! source (when the request is keyed by source id), derive the identity and
//! country filters per source type, resolve the index set through the
//! fallback chain, build the query, and dispatch it. Resolution and search
//! are one-shot and a failure is informative, never transient, so nothing
//! here retries.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use usagestats_core::{
    build_index_name, ByCountryParams, DateRange, IdentifierFilter, ResolvedIndexSet,
    SearchEngine, SourceRegistry, SourceType, StatsError, StatsResult, TimeSeriesParams,
    TimeUnit,
};

use crate::metrics::ReportMetricsCollector;
use crate::resolver::IndexResolver;

/// Composes the resolver, the registry, and the search engine into the
/// per-report-type operations exposed over HTTP.
pub struct ReportOrchestrator {
    resolver: IndexResolver,
    registry: Arc<dyn SourceRegistry>,
    search: Arc<dyn SearchEngine>,
    metrics: Arc<ReportMetricsCollector>,
}

/// Everything resolution produced for one report: the candidate indices,
/// the filters the query will embed, and a subject label for diagnostics.
#[derive(Debug, Clone)]
struct ReportScope {
    indices: ResolvedIndexSet,
    identifier: Option<IdentifierFilter>,
    country: Option<String>,
    subject: String,
}

impl ReportOrchestrator {
    pub fn new(registry: Arc<dyn SourceRegistry>, search: Arc<dyn SearchEngine>) -> Self {
        Self {
            resolver: IndexResolver::new(registry.clone()),
            registry,
            search,
            metrics: Arc::new(ReportMetricsCollector::new()),
        }
    }

    pub fn metrics(&self) -> &ReportMetricsCollector {
        &self.metrics
    }

    /// Time-series widget for a single item (or an unkeyed sweep)
    pub async fn item_widget(
        &self,
        identifier: Option<&str>,
        source_token: &str,
        range: DateRange,
        interval: TimeUnit,
    ) -> StatsResult<Value> {
        let scope = self.item_scope(identifier, source_token).await?;
        self.run_time_series(scope, range, interval, false).await
    }

    /// By-country widget for a single item (or an unkeyed sweep)
    pub async fn item_widget_by_country(
        &self,
        identifier: Option<&str>,
        source_token: &str,
        range: DateRange,
        limit: usize,
    ) -> StatsResult<Value> {
        let scope = self.item_scope(identifier, source_token).await?;
        self.run_by_country(scope, range, limit).await
    }

    /// Time-series widget for a registered source. `expected` restricts the
    /// source type for endpoints that demand one; `None` dispatches on the
    /// source's actual type.
    pub async fn source_widget(
        &self,
        source_id: &str,
        expected: Option<SourceType>,
        range: DateRange,
        interval: TimeUnit,
    ) -> StatsResult<Value> {
        let scope = self.source_scope(source_id, expected).await?;
        self.run_time_series(scope, range, interval, false).await
    }

    /// By-country widget for a registered source
    pub async fn source_widget_by_country(
        &self,
        source_id: &str,
        expected: Option<SourceType>,
        range: DateRange,
        limit: usize,
    ) -> StatsResult<Value> {
        let scope = self.source_scope(source_id, expected).await?;
        self.run_by_country(scope, range, limit).await
    }

    /// The level/action/time report, addressed by raw index-name tokens
    /// instead of registry lookups. Zero-count histogram buckets are
    /// emitted for this shape.
    pub async fn level_action_time(
        &self,
        identifier: Option<&str>,
        source_token: Option<&str>,
        country: Option<&str>,
        year: Option<&str>,
        range: DateRange,
        interval: TimeUnit,
    ) -> StatsResult<Value> {
        let pattern = build_index_name(
            source_token.unwrap_or("*"),
            country.unwrap_or("*"),
            year.unwrap_or("*"),
        );
        let scope = ReportScope {
            indices: ResolvedIndexSet::of(pattern),
            identifier: identifier.map(|i| IdentifierFilter::Exact(i.to_string())),
            country: None,
            subject: match identifier {
                Some(identifier) => format!("item '{}'", identifier),
                None => format!("source '{}'", source_token.unwrap_or("*")),
            },
        };
        self.run_time_series(scope, range, interval, true).await
    }

    /// Identifier-keyed resolution: the fallback chain over (identifier,
    /// source token), with an exact identity filter when an identifier was
    /// supplied.
    async fn item_scope(
        &self,
        identifier: Option<&str>,
        source_token: &str,
    ) -> StatsResult<ReportScope> {
        let indices = self
            .resolver
            .resolve_with_fallback(identifier, source_token)
            .await?;
        Ok(ReportScope {
            indices,
            identifier: identifier.map(|i| IdentifierFilter::Exact(i.to_string())),
            country: None,
            subject: match identifier {
                Some(identifier) => format!("item '{}'", identifier),
                None => format!("source '{}'", source_token),
            },
        })
    }

    /// Source-keyed resolution. The policy table: the source's actual type
    /// picks the index-resolution path and the filters the query carries.
    async fn source_scope(
        &self,
        source_id: &str,
        expected: Option<SourceType>,
    ) -> StatsResult<ReportScope> {
        let source = self
            .registry
            .source_by_id(source_id)
            .await?
            .ok_or_else(|| StatsError::source_not_found(source_id))?;

        if let Some(expected) = expected {
            IndexResolver::require_type(&source, expected)?;
        }

        let scope = match source.kind {
            SourceType::Repository => {
                let prefix = self.registry.identifier_prefix_for_source(&source).await?;
                let indices = match prefix.as_deref() {
                    Some(prefix) => {
                        self.resolver
                            .resolve_with_fallback(Some(prefix), &source.id)
                            .await?
                    }
                    None => self.resolver.resolve_by_source(&source.id).await?,
                };
                ReportScope {
                    indices,
                    identifier: prefix.map(IdentifierFilter::Prefix),
                    country: None,
                    subject: format!("repository '{}'", source.id),
                }
            }
            SourceType::National => ReportScope {
                indices: self.resolver.resolve_by_national_source(&source).await?,
                identifier: None,
                country: Some(source.country_iso.clone()),
                subject: format!("national aggregator '{}'", source.id),
            },
            SourceType::Regional => ReportScope {
                indices: self.resolver.resolve_by_regional_source(&source).await?,
                identifier: None,
                country: None,
                subject: format!("regional aggregator '{}'", source.id),
            },
        };

        Ok(scope)
    }

    async fn run_time_series(
        &self,
        scope: ReportScope,
        range: DateRange,
        interval: TimeUnit,
        emit_empty_buckets: bool,
    ) -> StatsResult<Value> {
        let ReportScope {
            indices,
            identifier,
            country,
            subject,
        } = scope;

        if indices.is_empty() {
            return Err(StatsError::empty_index_set(subject));
        }

        let params = TimeSeriesParams {
            identifier,
            country,
            range,
            interval,
            emit_empty_buckets,
        };
        self.dispatch(&params.build(), &indices, &subject).await
    }

    async fn run_by_country(
        &self,
        scope: ReportScope,
        range: DateRange,
        limit: usize,
    ) -> StatsResult<Value> {
        let ReportScope {
            indices,
            identifier,
            country,
            subject,
        } = scope;

        if indices.is_empty() {
            return Err(StatsError::empty_index_set(subject));
        }

        let params = ByCountryParams {
            identifier,
            country,
            range,
            limit,
        };
        self.dispatch(&params.build(), &indices, &subject).await
    }

    /// Dispatch the built query. Missing physical indices are the search
    /// engine's problem; an absent aggregations section is ours.
    async fn dispatch(
        &self,
        body: &Value,
        indices: &ResolvedIndexSet,
        subject: &str,
    ) -> StatsResult<Value> {
        let index_csv = indices.to_csv();
        debug!("Dispatching report for {} against [{}]", subject, index_csv);

        let started = Instant::now();
        let response = self.search.search(body, &index_csv).await?;
        self.metrics.record_search(started.elapsed());

        match response.aggregations {
            Some(aggregations) => {
                info!("Report served for {}", subject);
                Ok(aggregations)
            }
            None => Err(StatsError::NoAggregations),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRegistry, MockSearchEngine};

    fn orchestrator_with(
        registry: MockRegistry,
        search: MockSearchEngine,
    ) -> (ReportOrchestrator, Arc<MockSearchEngine>) {
        let search = Arc::new(search);
        let orchestrator = ReportOrchestrator::new(Arc::new(registry), search.clone());
        (orchestrator, search)
    }

    #[tokio::test]
    async fn test_repository_report_filters_by_identifier_prefix() {
        let (orchestrator, search) =
            orchestrator_with(MockRegistry::with_demo_hierarchy(), MockSearchEngine::new());

        orchestrator
            .source_widget("concytec", None, DateRange::default(), TimeUnit::Year)
            .await
            .unwrap();

        let requests = search.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].index_csv, "usage_stats_pe_concytec_*");
        assert_eq!(
            requests[0].body["query"]["bool"]["must"][0]["wildcard"]["identifier"]["value"],
            "oai:repositorio.concytec.gob.pe:*"
        );
    }

    #[tokio::test]
    async fn test_regional_source_dispatches_to_subtree_resolution() {
        let (orchestrator, search) =
            orchestrator_with(MockRegistry::with_demo_hierarchy(), MockSearchEngine::new());

        // A regional id on the repository endpoint: the policy table keys
        // off the actual source type, so the whole subtree is queried and
        // no identifier clause appears.
        orchestrator
            .source_widget("lareferencia::oai", None, DateRange::default(), TimeUnit::Year)
            .await
            .unwrap();

        let request = &search.requests()[0];
        assert!(request.index_csv.starts_with("usage_stats_00_lareferencia_oai_*"));
        assert!(request.index_csv.contains("usage_stats_pe_concytec_*"));
        assert!(request.body["query"]["bool"]["must"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_national_report_carries_country_filter() {
        let (orchestrator, search) =
            orchestrator_with(MockRegistry::with_demo_hierarchy(), MockSearchEngine::new());

        orchestrator
            .source_widget(
                "peru::national",
                Some(SourceType::National),
                DateRange::default(),
                TimeUnit::Month,
            )
            .await
            .unwrap();

        let request = &search.requests()[0];
        assert_eq!(request.body["query"]["bool"]["must"][0]["term"]["country"], "PE");
    }

    #[tokio::test]
    async fn test_type_expectation_is_enforced() {
        let (orchestrator, _) =
            orchestrator_with(MockRegistry::with_demo_hierarchy(), MockSearchEngine::new());

        let err = orchestrator
            .source_widget(
                "concytec",
                Some(SourceType::National),
                DateRange::default(),
                TimeUnit::Year,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::SourceTypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_unknown_source_is_terminal() {
        let (orchestrator, search) =
            orchestrator_with(MockRegistry::with_demo_hierarchy(), MockSearchEngine::new());

        let err = orchestrator
            .source_widget("UNKNOWN", None, DateRange::default(), TimeUnit::Year)
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::SourceNotFound(_)));
        assert!(err.to_string().contains("UNKNOWN"));
        assert!(search.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_set_is_terminal() {
        let registry = MockRegistry::with_demo_hierarchy().with_empty_subtrees();
        let (orchestrator, search) = orchestrator_with(registry, MockSearchEngine::new());

        let err = orchestrator
            .source_widget("lareferencia::oai", None, DateRange::default(), TimeUnit::Year)
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::EmptyIndexSet(_)));
        assert!(search.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_aggregations_fail_the_report() {
        let (orchestrator, _) = orchestrator_with(
            MockRegistry::with_demo_hierarchy(),
            MockSearchEngine::without_aggregations(),
        );

        let err = orchestrator
            .item_widget(None, "*", DateRange::default(), TimeUnit::Year)
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::NoAggregations));
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_without_retry() {
        let (orchestrator, search) = orchestrator_with(
            MockRegistry::with_demo_hierarchy(),
            MockSearchEngine::failing(),
        );

        let err = orchestrator
            .item_widget(None, "*", DateRange::default(), TimeUnit::Year)
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::BackendUnavailable(_)));
        assert_eq!(search.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_item_fallback_reaches_wildcard_indices() {
        let (orchestrator, search) =
            orchestrator_with(MockRegistry::with_demo_hierarchy(), MockSearchEngine::new());

        orchestrator
            .item_widget(
                Some("oai:repo:123"),
                "*",
                DateRange::default(),
                TimeUnit::Year,
            )
            .await
            .unwrap();

        let request = &search.requests()[0];
        assert_eq!(request.index_csv, "usage_stats_*_*_*");
        // The exact identifier still filters the query after the fallback.
        assert_eq!(
            request.body["query"]["bool"]["must"][0]["match_phrase"]["identifier"],
            "oai:repo:123"
        );
    }

    #[tokio::test]
    async fn test_by_country_report_embeds_limit() {
        let (orchestrator, search) =
            orchestrator_with(MockRegistry::with_demo_hierarchy(), MockSearchEngine::new());

        orchestrator
            .source_widget_by_country("concytec", None, DateRange::default(), 7)
            .await
            .unwrap();

        let request = &search.requests()[0];
        assert_eq!(
            request.body["aggs"]["stats_by_country"]["aggs"]["views"]["terms"]["size"],
            7
        );
    }

    #[tokio::test]
    async fn test_level_action_time_addresses_tokens_and_emits_empty_buckets() {
        let (orchestrator, search) =
            orchestrator_with(MockRegistry::with_demo_hierarchy(), MockSearchEngine::new());

        orchestrator
            .level_action_time(
                None,
                Some("LaReferencia::OAI"),
                Some("PE"),
                Some("2023"),
                DateRange::default(),
                TimeUnit::Month,
            )
            .await
            .unwrap();

        let request = &search.requests()[0];
        assert_eq!(request.index_csv, "usage_stats_pe_lareferencia_oai_2023");
        assert_eq!(
            request.body["aggs"]["level"]["aggs"]["time"]["date_histogram"]["min_doc_count"],
            0
        );
    }
}
