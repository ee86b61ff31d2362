//! Source hierarchy types
//!
//! A source is a registered entity in the usage statistics hierarchy: a
//! regional aggregator at the top, national aggregators beneath it, and
//! repositories (item collections) at the leaves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StatsError, StatsResult};

/// Position of a source in the three-tier hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Repository,
    National,
    Regional,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceType::Repository => "repository",
            SourceType::National => "national",
            SourceType::Regional => "regional",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SourceType {
    type Err = StatsError;

    fn from_str(s: &str) -> StatsResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "repository" => Ok(SourceType::Repository),
            "national" => Ok(SourceType::National),
            "regional" => Ok(SourceType::Regional),
            other => Err(StatsError::validation(format!(
                "unknown source type: {}",
                other
            ))),
        }
    }
}

/// A registered source.
///
/// Immutable once loaded from the registry; the resolver only ever borrows
/// it for the duration of one request. The `id` is the token that appears in
/// index names (two-colon separators allowed, e.g. `lareferencia::oai`).
/// `identifier_prefix` is set for repository sources only and uniquely keys
/// the repository against the leading portion of OAI identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub kind: SourceType,
    pub country_iso: String,
    pub identifier_prefix: Option<String>,
}

impl Source {
    pub fn new<S: Into<String>>(id: S, kind: SourceType, country_iso: S) -> Self {
        Self {
            id: id.into(),
            kind,
            country_iso: country_iso.into(),
            identifier_prefix: None,
        }
    }

    /// Attach an identifier prefix (repository sources)
    pub fn with_identifier_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.identifier_prefix = Some(prefix.into());
        self
    }

    /// The index pattern covering this source's own shards across all
    /// years. Regional aggregators own the reserved `00` country segment.
    pub fn index_pattern(&self) -> String {
        let country = match self.kind {
            SourceType::Regional => crate::REGIONAL_COUNTRY_SEGMENT,
            _ => self.country_iso.as_str(),
        };
        crate::index::build_index_name(&self.id, country, "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_round_trip() {
        for kind in [
            SourceType::Repository,
            SourceType::National,
            SourceType::Regional,
        ] {
            assert_eq!(kind.to_string().parse::<SourceType>().unwrap(), kind);
        }
        assert!("federation".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_source_builder() {
        let source = Source::new("scielo::pe", SourceType::Repository, "PE")
            .with_identifier_prefix("oai:scielo.pe:");
        assert_eq!(source.identifier_prefix.as_deref(), Some("oai:scielo.pe:"));
        assert_eq!(source.kind, SourceType::Repository);
    }

    #[test]
    fn test_index_pattern_per_tier() {
        let repository = Source::new("Concytec", SourceType::Repository, "PE");
        assert_eq!(repository.index_pattern(), "usage_stats_pe_concytec_*");

        let regional = Source::new("lareferencia::oai", SourceType::Regional, "00");
        assert_eq!(regional.index_pattern(), "usage_stats_00_lareferencia_oai_*");
    }
}
