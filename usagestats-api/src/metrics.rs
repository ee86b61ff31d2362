//! Metrics collection and reporting for the reports service

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Thread-safe metrics collector for report operations
#[derive(Debug)]
pub struct ReportMetricsCollector {
    /// Total reports served
    pub reports_total: AtomicU64,

    /// Total report failures (any taxonomy kind)
    pub errors_total: AtomicU64,

    /// Total searches dispatched to the backend
    pub searches_total: AtomicU64,

    /// Total time spent in backend searches
    pub search_time_total_ms: AtomicU64,

    /// Service start time
    start_time: Instant,
}

impl Default for ReportMetricsCollector {
    fn default() -> Self {
        Self {
            reports_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            searches_total: AtomicU64::new(0),
            search_time_total_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl ReportMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a served report
    pub fn record_report(&self) {
        self.reports_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed report
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a backend search and its duration
    pub fn record_search(&self, duration: Duration) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
        self.search_time_total_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> ReportMetricsSnapshot {
        let searches = self.searches_total.load(Ordering::Relaxed);
        let total_time = self.search_time_total_ms.load(Ordering::Relaxed);

        ReportMetricsSnapshot {
            reports_total: self.reports_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            searches_total: searches,
            search_time_total_ms: total_time,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            avg_search_time_ms: if searches > 0 {
                total_time as f64 / searches as f64
            } else {
                0.0
            },
        }
    }

    /// Generate Prometheus format metrics
    pub fn prometheus_format(&self) -> String {
        let snapshot = self.snapshot();

        format!(
            "# HELP usagestats_reports_total Total number of reports served\n\
             # TYPE usagestats_reports_total counter\n\
             usagestats_reports_total {}\n\
             \n\
             # HELP usagestats_report_errors_total Total number of failed reports\n\
             # TYPE usagestats_report_errors_total counter\n\
             usagestats_report_errors_total {}\n\
             \n\
             # HELP usagestats_searches_total Total number of backend searches\n\
             # TYPE usagestats_searches_total counter\n\
             usagestats_searches_total {}\n\
             \n\
             # HELP usagestats_avg_search_time_ms Average backend search time in milliseconds\n\
             # TYPE usagestats_avg_search_time_ms gauge\n\
             usagestats_avg_search_time_ms {}\n\
             \n\
             # HELP usagestats_uptime_seconds Service uptime in seconds\n\
             # TYPE usagestats_uptime_seconds gauge\n\
             usagestats_uptime_seconds {}\n",
            snapshot.reports_total,
            snapshot.errors_total,
            snapshot.searches_total,
            snapshot.avg_search_time_ms,
            snapshot.uptime_seconds
        )
    }
}

/// Point-in-time view of the collector
#[derive(Debug, Clone)]
pub struct ReportMetricsSnapshot {
    pub reports_total: u64,
    pub errors_total: u64,
    pub searches_total: u64,
    pub search_time_total_ms: u64,
    pub uptime_seconds: u64,
    pub avg_search_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = ReportMetricsCollector::new();
        metrics.record_report();
        metrics.record_report();
        metrics.record_error();
        metrics.record_search(Duration::from_millis(10));
        metrics.record_search(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.reports_total, 2);
        assert_eq!(snapshot.errors_total, 1);
        assert_eq!(snapshot.searches_total, 2);
        assert_eq!(snapshot.avg_search_time_ms, 20.0);
    }

    #[test]
    fn test_prometheus_format_lists_counters() {
        let metrics = ReportMetricsCollector::new();
        metrics.record_report();
        let text = metrics.prometheus_format();
        assert!(text.contains("# HELP usagestats_reports_total"));
        assert!(text.contains("usagestats_reports_total 1"));
    }
}
