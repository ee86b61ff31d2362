//! Index resolution over the source registry
//!
//! Turns a (kind, key) pair into the ordered, deduplicated set of index
//! patterns that may contain matching usage events. All operations are pure
//! given a registry snapshot: repeated calls observe the same patterns for
//! the same input until the registry changes.

use std::sync::Arc;
use tracing::debug;

use usagestats_core::{
    ResolvedIndexSet, Source, SourceRegistry, SourceType, StatsError, StatsResult,
};

/// Outcome of identifier-based resolution.
///
/// `UnknownPrefix` is an explicit control-flow tag: the caller falls back to
/// coarser source-based resolution instead of retrying, and the tag never
/// surfaces past the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixLookup {
    Found(ResolvedIndexSet),
    UnknownPrefix,
}

/// Resolves request keys to index-pattern sets
pub struct IndexResolver {
    registry: Arc<dyn SourceRegistry>,
}

impl IndexResolver {
    pub fn new(registry: Arc<dyn SourceRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve by identifier prefix. A trailing wildcard on the supplied
    /// prefix is stripped for the registry match only; index construction
    /// happens against the registered repository, not the raw input.
    pub async fn resolve_by_identifier(&self, prefix: &str) -> StatsResult<PrefixLookup> {
        let key = prefix.trim_end_matches('*');
        match self
            .registry
            .index_patterns_for_identifier_prefix(key)
            .await?
        {
            Some(set) => Ok(PrefixLookup::Found(set)),
            None => Ok(PrefixLookup::UnknownPrefix),
        }
    }

    /// Resolve from a bare source token (possibly `*`). Never fails; an
    /// unknown token yields a wildcard-segment pattern whose emptiness only
    /// shows up in the search result.
    pub async fn resolve_by_source(&self, token: &str) -> StatsResult<ResolvedIndexSet> {
        self.registry.index_patterns_for_source_token(token).await
    }

    /// Resolve the subtree of a national aggregator
    pub async fn resolve_by_national_source(&self, source: &Source) -> StatsResult<ResolvedIndexSet> {
        debug_assert_eq!(source.kind, SourceType::National);
        self.registry.index_patterns_for_national_source(source).await
    }

    /// Resolve the whole subtree of a regional aggregator
    pub async fn resolve_by_regional_source(&self, source: &Source) -> StatsResult<ResolvedIndexSet> {
        debug_assert_eq!(source.kind, SourceType::Regional);
        self.registry.index_patterns_for_regional_source(source).await
    }

    /// The fallback chain: identifier first (most specific), source token
    /// second. Short-circuits on the first hit; an empty set after the full
    /// chain is terminal for the caller.
    pub async fn resolve_with_fallback(
        &self,
        identifier: Option<&str>,
        source_token: &str,
    ) -> StatsResult<ResolvedIndexSet> {
        if let Some(identifier) = identifier {
            match self.resolve_by_identifier(identifier).await? {
                PrefixLookup::Found(set) => return Ok(set),
                PrefixLookup::UnknownPrefix => {
                    debug!(
                        "No repository registered for identifier '{}', falling back to source '{}'",
                        identifier, source_token
                    );
                }
            }
        }
        self.resolve_by_source(source_token).await
    }

    /// Expected-type guard used by the type-restricted endpoints
    pub fn require_type(source: &Source, expected: SourceType) -> StatsResult<()> {
        if source.kind != expected {
            return Err(StatsError::SourceTypeMismatch {
                id: source.id.clone(),
                expected,
                actual: source.kind,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRegistry;

    fn resolver() -> IndexResolver {
        IndexResolver::new(Arc::new(MockRegistry::with_demo_hierarchy()))
    }

    #[tokio::test]
    async fn test_registered_prefix_resolves_and_is_stable() {
        let resolver = resolver();
        let first = resolver
            .resolve_by_identifier("oai:repositorio.concytec.gob.pe:")
            .await
            .unwrap();
        let second = resolver
            .resolve_by_identifier("oai:repositorio.concytec.gob.pe:")
            .await
            .unwrap();

        match (&first, &second) {
            (PrefixLookup::Found(a), PrefixLookup::Found(b)) => {
                assert!(!a.is_empty());
                assert_eq!(a, b);
            }
            other => panic!("expected Found for a registered prefix, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_trailing_wildcard_is_stripped_for_matching() {
        let resolver = resolver();
        let looked_up = resolver
            .resolve_by_identifier("oai:repositorio.concytec.gob.pe:*")
            .await
            .unwrap();
        assert!(matches!(looked_up, PrefixLookup::Found(_)));
    }

    #[tokio::test]
    async fn test_unknown_prefix_is_a_tag_not_an_error() {
        let resolver = resolver();
        let looked_up = resolver.resolve_by_identifier("oai:nowhere:").await.unwrap();
        assert_eq!(looked_up, PrefixLookup::UnknownPrefix);
    }

    #[tokio::test]
    async fn test_fallback_chain_prefers_identifier() {
        let resolver = resolver();
        let set = resolver
            .resolve_with_fallback(Some("oai:repositorio.concytec.gob.pe:"), "*")
            .await
            .unwrap();
        assert_eq!(set.to_csv(), "usage_stats_pe_concytec_*");
    }

    #[tokio::test]
    async fn test_fallback_chain_falls_through_to_source_token() {
        let resolver = resolver();
        let set = resolver
            .resolve_with_fallback(Some("oai:nowhere:123"), "*")
            .await
            .unwrap();
        assert_eq!(set.to_csv(), "usage_stats_*_*_*");
    }

    #[tokio::test]
    async fn test_source_token_resolution_never_fails() {
        let resolver = resolver();
        let set = resolver.resolve_by_source("No::Such::Source").await.unwrap();
        assert_eq!(set.to_csv(), "usage_stats_*_no_such_source_*");
    }

    #[tokio::test]
    async fn test_national_subtree_covers_repositories() {
        let resolver = resolver();
        let registry = MockRegistry::with_demo_hierarchy();
        let national = registry.source("peru::national").unwrap();
        let set = resolver.resolve_by_national_source(&national).await.unwrap();
        assert!(set.iter().any(|p| p == "usage_stats_pe_peru_national_*"));
        assert!(set.iter().any(|p| p == "usage_stats_pe_concytec_*"));
    }

    #[tokio::test]
    async fn test_regional_subtree_uses_reserved_country_segment() {
        let resolver = resolver();
        let registry = MockRegistry::with_demo_hierarchy();
        let regional = registry.source("lareferencia::oai").unwrap();
        let set = resolver.resolve_by_regional_source(&regional).await.unwrap();
        assert_eq!(set.iter().next(), Some("usage_stats_00_lareferencia_oai_*"));
        assert!(set.len() > 1);
    }
}
