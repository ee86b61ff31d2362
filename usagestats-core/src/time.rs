//! Time handling for report queries
//!
//! Report date bounds are passed through to the search engine verbatim, so
//! a bound is either an absolute ISO-8601 timestamp / calendar date or a
//! relative date-math expression anchored at `now` (e.g. `now-1y`). The
//! service validates the shape up front rather than letting the backend
//! reject the query.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StatsError, StatsResult};

/// Bucket width of the time-series histogram (a calendar interval)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
}

impl TimeUnit {
    /// The calendar-interval token understood by the search engine
    pub fn as_calendar_interval(&self) -> &'static str {
        match self {
            TimeUnit::Year => "year",
            TimeUnit::Quarter => "quarter",
            TimeUnit::Month => "month",
            TimeUnit::Week => "week",
            TimeUnit::Day => "day",
            TimeUnit::Hour => "hour",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_calendar_interval())
    }
}

impl FromStr for TimeUnit {
    type Err = StatsError;

    fn from_str(s: &str) -> StatsResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "year" => Ok(TimeUnit::Year),
            "quarter" => Ok(TimeUnit::Quarter),
            "month" => Ok(TimeUnit::Month),
            "week" => Ok(TimeUnit::Week),
            "day" => Ok(TimeUnit::Day),
            "hour" => Ok(TimeUnit::Hour),
            other => Err(StatsError::validation(format!(
                "unknown time unit: {}",
                other
            ))),
        }
    }
}

/// Inclusive date range of a report, both bounds kept in wire form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    /// Create a range, validating that both bounds are date expressions the
    /// search engine will accept.
    pub fn new<S: Into<String>>(start: S, end: S) -> StatsResult<Self> {
        let start = start.into();
        let end = end.into();
        validate_date_expr(&start)?;
        validate_date_expr(&end)?;
        Ok(Self { start, end })
    }
}

impl Default for DateRange {
    /// The trailing year, the default reporting window
    fn default() -> Self {
        Self {
            start: "now-1y".to_string(),
            end: "now".to_string(),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.start, self.end)
    }
}

/// Accept `now`-anchored date math, RFC 3339 timestamps, or plain calendar
/// dates. Anything else is rejected before it reaches the backend.
fn validate_date_expr(expr: &str) -> StatsResult<()> {
    if expr.is_empty() {
        return Err(StatsError::validation("empty date expression"));
    }

    if let Some(rest) = expr.strip_prefix("now") {
        let valid_math = rest.is_empty()
            || rest
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '/'));
        if valid_math {
            return Ok(());
        }
        return Err(StatsError::validation(format!(
            "invalid date math expression: {}",
            expr
        )));
    }

    if chrono::DateTime::parse_from_rfc3339(expr).is_ok()
        || NaiveDate::parse_from_str(expr, "%Y-%m-%d").is_ok()
    {
        return Ok(());
    }

    Err(StatsError::validation(format!(
        "invalid date expression: {}",
        expr
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_unit_parsing() {
        assert_eq!("year".parse::<TimeUnit>().unwrap(), TimeUnit::Year);
        assert_eq!("MONTH".parse::<TimeUnit>().unwrap(), TimeUnit::Month);
        assert!("fortnight".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_default_range_is_trailing_year() {
        let range = DateRange::default();
        assert_eq!(range.start, "now-1y");
        assert_eq!(range.end, "now");
    }

    #[test]
    fn test_accepts_date_math_and_absolute_dates() {
        assert!(DateRange::new("now-6M/M", "now").is_ok());
        assert!(DateRange::new("2023-01-01", "2023-12-31").is_ok());
        assert!(DateRange::new("2023-01-01T00:00:00Z", "now").is_ok());
    }

    #[test]
    fn test_rejects_junk_bounds() {
        assert!(DateRange::new("yesterday", "now").is_err());
        assert!(DateRange::new("", "now").is_err());
        assert!(DateRange::new("now-1y", "not a date").is_err());
    }
}
