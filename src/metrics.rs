//! Request metrics for the scoring endpoint
//!
//! Counts predictions by outcome and accumulates scoring latency:
//! - successful predictions
//! - client errors (400: missing or invalid features)
//! - internal errors (500: scaler, model or unexpected failures)
//!
//! Exposed in Prometheus text format on `GET /metrics`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Central metrics collector shared by all handlers
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    total_requests: Arc<AtomicUsize>,
    successful_requests: Arc<AtomicUsize>,
    client_errors: Arc<AtomicUsize>,
    internal_errors: Arc<AtomicUsize>,
    /// Scoring time of successful requests, microseconds
    total_latency_us: Arc<AtomicU64>,
    start_time: Instant,
}

impl MetricsCollector {
    /// Create a new metrics collector
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_requests: Arc::new(AtomicUsize::new(0)),
            successful_requests: Arc::new(AtomicUsize::new(0)),
            client_errors: Arc::new(AtomicUsize::new(0)),
            internal_errors: Arc::new(AtomicUsize::new(0)),
            total_latency_us: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    #[allow(clippy::cast_possible_truncation)]
    pub fn record_success(&self, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record a rejected request
    pub fn record_client_error(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that failed inside the service
    pub fn record_internal_error(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of metrics
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let client_errors = self.client_errors.load(Ordering::Relaxed);
        let internal_errors = self.internal_errors.load(Ordering::Relaxed);
        let total_latency_us = self.total_latency_us.load(Ordering::Relaxed);
        let uptime = self.start_time.elapsed();

        MetricsSnapshot {
            total_requests,
            successful_requests: successful,
            client_errors,
            internal_errors,
            total_latency_us,
            uptime_secs: uptime.as_secs(),
            requests_per_sec: if uptime.as_secs() > 0 {
                total_requests as f64 / uptime.as_secs_f64()
            } else {
                0.0
            },
            avg_latency_ms: if successful > 0 {
                (total_latency_us as f64 / 1000.0) / successful as f64
            } else {
                0.0
            },
            error_rate: if total_requests > 0 {
                (client_errors + internal_errors) as f64 / total_requests as f64
            } else {
                0.0
            },
        }
    }

    /// Export metrics in Prometheus format
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            "# HELP claimscore_requests_total Total prediction requests\n\
             # TYPE claimscore_requests_total counter\n\
             claimscore_requests_total {}\n\
             # HELP claimscore_predictions_total Successful predictions\n\
             # TYPE claimscore_predictions_total counter\n\
             claimscore_predictions_total {}\n\
             # HELP claimscore_client_errors_total Requests rejected with 400\n\
             # TYPE claimscore_client_errors_total counter\n\
             claimscore_client_errors_total {}\n\
             # HELP claimscore_internal_errors_total Requests failed with 500\n\
             # TYPE claimscore_internal_errors_total counter\n\
             claimscore_internal_errors_total {}\n\
             # HELP claimscore_requests_per_second Request rate\n\
             # TYPE claimscore_requests_per_second gauge\n\
             claimscore_requests_per_second {:.2}\n\
             # HELP claimscore_avg_latency_ms Average scoring latency in milliseconds\n\
             # TYPE claimscore_avg_latency_ms gauge\n\
             claimscore_avg_latency_ms {:.3}\n\
             # HELP claimscore_error_rate Error rate (0.0-1.0)\n\
             # TYPE claimscore_error_rate gauge\n\
             claimscore_error_rate {:.4}\n\
             # HELP claimscore_uptime_seconds Uptime in seconds\n\
             # TYPE claimscore_uptime_seconds counter\n\
             claimscore_uptime_seconds {}\n",
            snapshot.total_requests,
            snapshot.successful_requests,
            snapshot.client_errors,
            snapshot.internal_errors,
            snapshot.requests_per_sec,
            snapshot.avg_latency_ms,
            snapshot.error_rate,
            snapshot.uptime_secs
        )
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total number of prediction requests
    pub total_requests: usize,
    /// Number of successful predictions
    pub successful_requests: usize,
    /// Number of 400 responses
    pub client_errors: usize,
    /// Number of 500 responses
    pub internal_errors: usize,
    /// Total scoring time in microseconds
    pub total_latency_us: u64,
    /// System uptime in seconds
    pub uptime_secs: u64,
    /// Request rate (requests per second)
    pub requests_per_sec: f64,
    /// Average successful request latency in milliseconds
    pub avg_latency_ms: f64,
    /// Error rate as a fraction (0.0 to 1.0)
    pub error_rate: f64,
}
