//! Aggregation-query templates
//!
//! Two reusable request bodies, both with `size = 0` so the search engine
//! returns aggregations only:
//! - the time-series widget: summed measures broken down by level and
//!   bucketed over time
//! - the by-country widget: summed measures plus a per-measure top-N
//!   country ranking over the nested `stats_by_country` sub-structure
//!
//! Every build returns an independently owned body. Filters are embedded by
//! value, and an absent filter removes its clause entirely instead of
//! degenerating into an always-true predicate.

use serde_json::{json, Map, Value};

use crate::time::{DateRange, TimeUnit};
use crate::{DEFAULT_COUNTRY_LIMIT, LEVEL_BREAKDOWN_SIZE};

/// The four numeric measures carried by every usage-event document
pub const MEASURES: [&str; 4] = ["views", "downloads", "conversions", "outlinks"];

/// Keyword field holding the full OAI identifier of the target item
pub const FIELD_IDENTIFIER: &str = "identifier";

/// Keyword field holding the two-letter country code of the event
pub const FIELD_COUNTRY: &str = "country";

/// Keyword field holding the hierarchy level that recorded the event
pub const FIELD_LEVEL: &str = "level";

/// Date field holding the event timestamp
pub const FIELD_TIME: &str = "time";

/// Nested object repeating the four measures per country
pub const NESTED_COUNTRY_PATH: &str = "stats_by_country";

/// Identity filter applied to the identifier field.
///
/// `Exact` requires a phrase match on the full identifier; `Prefix` matches
/// everything under an identifier prefix by appending a trailing wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierFilter {
    Exact(String),
    Prefix(String),
}

impl IdentifierFilter {
    fn to_clause(&self) -> Value {
        match self {
            IdentifierFilter::Exact(identifier) => json!({
                "match_phrase": { FIELD_IDENTIFIER: identifier }
            }),
            IdentifierFilter::Prefix(prefix) => json!({
                "wildcard": {
                    FIELD_IDENTIFIER: { "value": format!("{}*", prefix.trim_end_matches('*')) }
                }
            }),
        }
    }
}

/// Parameters of the time-series widget query
#[derive(Debug, Clone)]
pub struct TimeSeriesParams {
    pub identifier: Option<IdentifierFilter>,
    pub country: Option<String>,
    pub range: DateRange,
    pub interval: TimeUnit,
    /// Emit histogram buckets containing zero events. The widget endpoints
    /// suppress them; the level/action/time report emits them.
    pub emit_empty_buckets: bool,
}

impl TimeSeriesParams {
    pub fn new(range: DateRange, interval: TimeUnit) -> Self {
        Self {
            identifier: None,
            country: None,
            range,
            interval,
            emit_empty_buckets: false,
        }
    }

    /// Build the aggregation request body
    pub fn build(&self) -> Value {
        let min_doc_count = if self.emit_empty_buckets { 0 } else { 1 };

        let mut level_aggs = measure_sums();
        level_aggs.insert(
            "time".to_string(),
            json!({
                "date_histogram": {
                    "field": FIELD_TIME,
                    "calendar_interval": self.interval.as_calendar_interval(),
                    "min_doc_count": min_doc_count
                },
                "aggs": Value::Object(measure_sums())
            }),
        );

        let mut aggs = measure_sums();
        aggs.insert(
            "level".to_string(),
            json!({
                "terms": {
                    "field": FIELD_LEVEL,
                    "order": { "_key": "desc" },
                    "size": LEVEL_BREAKDOWN_SIZE
                },
                "aggs": Value::Object(level_aggs)
            }),
        );

        json!({
            "size": 0,
            "query": bool_query(self.identifier.as_ref(), self.country.as_deref(), &self.range),
            "aggs": Value::Object(aggs)
        })
    }
}

/// Parameters of the by-country widget query
#[derive(Debug, Clone)]
pub struct ByCountryParams {
    pub identifier: Option<IdentifierFilter>,
    pub country: Option<String>,
    pub range: DateRange,
    /// Countries returned per measure, ranked by document count
    pub limit: usize,
}

impl ByCountryParams {
    pub fn new(range: DateRange) -> Self {
        Self {
            identifier: None,
            country: None,
            range,
            limit: DEFAULT_COUNTRY_LIMIT,
        }
    }

    /// Build the aggregation request body
    pub fn build(&self) -> Value {
        let mut per_measure = Map::new();
        for measure in MEASURES {
            per_measure.insert(
                measure.to_string(),
                json!({
                    "terms": {
                        "field": format!("{}.{}", NESTED_COUNTRY_PATH, FIELD_COUNTRY),
                        "order": { "_count": "desc" },
                        "size": self.limit
                    },
                    "aggs": {
                        "total": {
                            "sum": { "field": format!("{}.{}", NESTED_COUNTRY_PATH, measure) }
                        }
                    }
                }),
            );
        }

        let mut aggs = measure_sums();
        aggs.insert(
            NESTED_COUNTRY_PATH.to_string(),
            json!({
                "nested": { "path": NESTED_COUNTRY_PATH },
                "aggs": Value::Object(per_measure)
            }),
        );

        json!({
            "size": 0,
            "query": bool_query(self.identifier.as_ref(), self.country.as_deref(), &self.range),
            "aggs": Value::Object(aggs)
        })
    }
}

/// Top-level sums of the four measures
fn measure_sums() -> Map<String, Value> {
    let mut sums = Map::new();
    for measure in MEASURES {
        sums.insert(measure.to_string(), json!({ "sum": { "field": measure } }));
    }
    sums
}

/// The shared boolean query: a mandatory inclusive date-range filter plus
/// the optional identity and country predicates. Absent predicates leave the
/// `must` list shorter rather than inserting match-alls.
fn bool_query(
    identifier: Option<&IdentifierFilter>,
    country: Option<&str>,
    range: &DateRange,
) -> Value {
    let mut must = Vec::new();
    if let Some(filter) = identifier {
        must.push(filter.to_clause());
    }
    if let Some(country) = country {
        must.push(json!({ "term": { FIELD_COUNTRY: country } }));
    }

    json!({
        "bool": {
            "must": must,
            "filter": [
                {
                    "range": {
                        FIELD_TIME: {
                            "gte": range.start,
                            "lte": range.end,
                            "format": "strict_date_optional_time"
                        }
                    }
                }
            ]
        }
    })
}
