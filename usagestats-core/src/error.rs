//! Error types for usage statistics operations

use thiserror::Error;

use crate::source::SourceType;

/// Result type for usage statistics operations
pub type StatsResult<T> = Result<T, StatsError>;

/// Error taxonomy for report resolution and dispatch.
///
/// Every kind is caught at the report orchestrator boundary and mapped to a
/// single user-visible "not found" outcome; none is retried. Note that an
/// unknown identifier prefix is *not* represented here: it is a control-flow
/// tag (`PrefixLookup::UnknownPrefix`) that triggers fallback to
/// source-based resolution and never crosses the HTTP boundary.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("source '{id}' is of type {actual}, endpoint requires {expected}")]
    SourceTypeMismatch {
        id: String,
        expected: SourceType,
        actual: SourceType,
    },

    #[error("no usage indices resolved for {0}")]
    EmptyIndexSet(String),

    #[error("search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("search response carries no aggregations")]
    NoAggregations,

    #[error("registry error: {0}")]
    Registry(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StatsError {
    /// Create a new source-not-found error
    pub fn source_not_found<S: Into<String>>(id: S) -> Self {
        Self::SourceNotFound(id.into())
    }

    /// Create a new empty-index-set error
    pub fn empty_index_set<S: Into<String>>(subject: S) -> Self {
        Self::EmptyIndexSet(subject.into())
    }

    /// Create a new backend-unavailable error
    pub fn backend_unavailable<S: Into<String>>(message: S) -> Self {
        Self::BackendUnavailable(message.into())
    }

    /// Create a new registry error
    pub fn registry<S: Into<String>>(message: S) -> Self {
        Self::Registry(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Get the error category for monitoring/metrics
    pub fn category(&self) -> &'static str {
        match self {
            StatsError::SourceNotFound(_) => "source_not_found",
            StatsError::SourceTypeMismatch { .. } => "source_type_mismatch",
            StatsError::EmptyIndexSet(_) => "empty_index_set",
            StatsError::BackendUnavailable(_) => "backend_unavailable",
            StatsError::NoAggregations => "no_aggregations",
            StatsError::Registry(_) => "registry",
            StatsError::Validation(_) => "validation",
            StatsError::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_subject() {
        let err = StatsError::source_not_found("UNKNOWN");
        assert!(err.to_string().contains("UNKNOWN"));

        let err = StatsError::SourceTypeMismatch {
            id: "lrf::network".to_string(),
            expected: SourceType::National,
            actual: SourceType::Regional,
        };
        assert!(err.to_string().contains("lrf::network"));
        assert!(err.to_string().contains("regional"));
    }

    #[test]
    fn test_category() {
        assert_eq!(StatsError::NoAggregations.category(), "no_aggregations");
        assert_eq!(
            StatsError::backend_unavailable("boom").category(),
            "backend_unavailable"
        );
    }
}
