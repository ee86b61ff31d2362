//! Source registry contract
//!
//! The registry is the external system of record for the source hierarchy.
//! The report service consumes exactly these operations; how the registry
//! stores its facts is out of scope here. Implementations must be safe for
//! concurrent use; the service shares one client across all requests.

use async_trait::async_trait;

use crate::error::StatsResult;
use crate::index::{build_index_name, ResolvedIndexSet};
use crate::source::Source;

#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// Look up a source by its id. Absence is a fact, not an error.
    async fn source_by_id(&self, id: &str) -> StatsResult<Option<Source>>;

    /// The identifier prefix registered for a source, if any. Only
    /// repository sources carry one.
    async fn identifier_prefix_for_source(&self, source: &Source) -> StatsResult<Option<String>> {
        Ok(source.identifier_prefix.clone())
    }

    /// Index patterns for the repository owning an identifier prefix.
    /// `None` means no repository claims the prefix; the caller decides
    /// whether to fall back to coarser resolution.
    async fn index_patterns_for_identifier_prefix(
        &self,
        prefix: &str,
    ) -> StatsResult<Option<ResolvedIndexSet>>;

    /// Index patterns built from a bare source token (which may be `*`).
    /// Requires no registry presence and never fails: an unresolvable token
    /// simply yields a pattern with wildcard country and year segments.
    async fn index_patterns_for_source_token(&self, token: &str) -> StatsResult<ResolvedIndexSet> {
        Ok(ResolvedIndexSet::of(build_index_name(token, "*", "*")))
    }

    /// Index patterns covering a national aggregator and the repositories
    /// in its registry subtree.
    async fn index_patterns_for_national_source(
        &self,
        source: &Source,
    ) -> StatsResult<ResolvedIndexSet>;

    /// Index patterns covering a whole regional subtree: the regional
    /// aggregator's own indices plus every national aggregator and
    /// repository beneath it.
    async fn index_patterns_for_regional_source(
        &self,
        source: &Source,
    ) -> StatsResult<ResolvedIndexSet>;
}
