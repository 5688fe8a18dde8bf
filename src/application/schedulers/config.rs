//! Timing and batch settings for the reconciliation schedulers.

use std::time::Duration;

/// Configuration shared by the four schedulers.
///
/// | Scheduler | Interval | Batch | Error backoff |
/// |-----------|----------|-------|---------------|
/// | pending requests | 5s | 5 | 10s |
/// | failed requests | 60s | 5 | 10s |
/// | pending invoices | 10m | - | next tick |
/// | expiry sweeper | 10m | - | 5m |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub pending_requests_interval: Duration,
    pub pending_requests_batch: u32,

    pub failed_requests_interval: Duration,
    pub failed_requests_batch: u32,

    /// FAILED requests with `retry_count` at or below this are requeued.
    pub max_request_retries: u32,

    pub pending_invoices_interval: Duration,

    /// Only payments created within this window are polled.
    pub pending_invoices_lookback: Duration,

    pub expiry_interval: Duration,

    /// Wait after a failed batch fetch in the request schedulers.
    pub fetch_error_backoff: Duration,

    /// Wait after a failed batch fetch in the expiry sweeper.
    pub expiry_error_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pending_requests_interval: Duration::from_secs(5),
            pending_requests_batch: 5,
            failed_requests_interval: Duration::from_secs(60),
            failed_requests_batch: 5,
            max_request_retries: 3,
            pending_invoices_interval: Duration::from_secs(10 * 60),
            pending_invoices_lookback: Duration::from_secs(24 * 60 * 60),
            expiry_interval: Duration::from_secs(10 * 60),
            fetch_error_backoff: Duration::from_secs(10),
            expiry_error_backoff: Duration::from_secs(5 * 60),
        }
    }
}
