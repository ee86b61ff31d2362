//! Index-name construction and resolved index sets
//!
//! Usage events live in time-sharded search indices named
//! `usage_stats_<country>_<source>_<year>`, always lower-cased, with the
//! two-colon separator of source tokens flattened to an underscore. Any
//! segment may be the wildcard `*`; the search engine expands patterns over
//! the dynamic namespace at query time.

use std::fmt;

/// Build an index name (or pattern) from its three segments.
///
/// Idempotent and case-normalizing: feeding an already-built name back in
/// yields the same string.
pub fn build_index_name(source: &str, country: &str, year: &str) -> String {
    let source = source.replace("::", "_");
    format!("usage_stats_{}_{}_{}", country, source, year).to_lowercase()
}

/// An ordered, deduplicated set of index-name patterns.
///
/// Order is insertion order: the most specific pattern a resolver produced
/// comes first. An empty set is a legitimate terminal "not found" condition
/// for the caller, never something to retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIndexSet {
    patterns: Vec<String>,
}

impl ResolvedIndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding a single pattern
    pub fn of<S: Into<String>>(pattern: S) -> Self {
        let mut set = Self::new();
        set.insert(pattern.into());
        set
    }

    /// Insert a pattern, keeping the first occurrence's position
    pub fn insert<S: Into<String>>(&mut self, pattern: S) {
        let pattern = pattern.into();
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    /// Append every pattern of another set
    pub fn extend(&mut self, other: ResolvedIndexSet) {
        for pattern in other.patterns {
            self.insert(pattern);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    /// Comma-separated form accepted by the search engine's index parameter
    pub fn to_csv(&self) -> String {
        self.patterns.join(",")
    }
}

impl From<Vec<String>> for ResolvedIndexSet {
    fn from(patterns: Vec<String>) -> Self {
        let mut set = Self::new();
        for pattern in patterns {
            set.insert(pattern);
        }
        set
    }
}

impl fmt::Display for ResolvedIndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_csv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_index_name_normalizes() {
        assert_eq!(
            build_index_name("LaReferencia::OAI", "PE", "2023"),
            "usage_stats_pe_lareferencia_oai_2023"
        );
    }

    #[test]
    fn test_build_index_name_is_stable_on_normalized_input() {
        // Re-running construction on already-normalized segments changes nothing.
        let once = build_index_name("Scielo::BR", "BR", "2024");
        let again = build_index_name("scielo_br", "br", "2024");
        assert_eq!(once, again);
        assert_eq!(once.to_lowercase(), once);
    }

    #[test]
    fn test_build_index_name_wildcards() {
        assert_eq!(build_index_name("*", "*", "*"), "usage_stats_*_*_*");
        assert_eq!(build_index_name("redalyc", "*", "2024"), "usage_stats_*_redalyc_2024");
    }

    #[test]
    fn test_resolved_set_orders_and_dedups() {
        let mut set = ResolvedIndexSet::new();
        set.insert("usage_stats_pe_a_*");
        set.insert("usage_stats_br_b_*");
        set.insert("usage_stats_pe_a_*");
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_csv(), "usage_stats_pe_a_*,usage_stats_br_b_*");
    }

    #[test]
    fn test_empty_set() {
        let set = ResolvedIndexSet::new();
        assert!(set.is_empty());
        assert_eq!(set.to_csv(), "");
    }

    #[test]
    fn test_extend_preserves_first_occurrence() {
        let mut a = ResolvedIndexSet::of("usage_stats_00_lrf_*");
        let mut b = ResolvedIndexSet::of("usage_stats_00_lrf_*");
        b.insert("usage_stats_pe_concytec_*");
        a.extend(b);
        assert_eq!(a.to_csv(), "usage_stats_00_lrf_*,usage_stats_pe_concytec_*");
    }
}
