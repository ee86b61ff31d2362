//! # Usage Statistics Core Library
//!
//! Shared library providing the domain types for the usage statistics
//! reports service: the source hierarchy, index-name resolution types,
//! aggregation-query templates, and the collaborator contracts for the
//! source registry and the search engine.
//!
//! ## Architecture
//!
//! The service answers "how much was X used, over period P, broken down by
//! level/time/country?". Everything in this crate is pure given a registry
//! snapshot:
//! - **Sources**: the three-tier hierarchy (regional aggregator → national
//!   aggregator → repository)
//! - **Indices**: construction of time-sharded index-name patterns
//! - **Queries**: the two reusable aggregation-query templates (time-series
//!   widget, by-country widget)
//! - **Contracts**: traits consumed by the report orchestrator, implemented
//!   by the storage and transport adapters in the service crate

pub mod error;
pub mod index;
pub mod query;
pub mod registry;
pub mod search;
pub mod source;
pub mod time;

// Re-export commonly used types
pub use error::{StatsError, StatsResult};
pub use index::{build_index_name, ResolvedIndexSet};
pub use query::{ByCountryParams, IdentifierFilter, TimeSeriesParams};
pub use registry::SourceRegistry;
pub use search::{SearchEngine, SearchResponse};
pub use source::{Source, SourceType};
pub use time::{DateRange, TimeUnit};

/// Version information for the usage statistics service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Country segment used in index names owned by a regional aggregator
pub const REGIONAL_COUNTRY_SEGMENT: &str = "00";

/// Number of distinct levels returned by the time-series breakdown
pub const LEVEL_BREAKDOWN_SIZE: u32 = 5;

/// Default number of countries per measure in the by-country breakdown
pub const DEFAULT_COUNTRY_LIMIT: usize = 10;
