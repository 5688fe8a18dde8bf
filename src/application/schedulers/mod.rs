//! Reconciliation schedulers.
//!
//! Four independent polling jobs drive requests and payments through their
//! lifecycle:
//!
//! - `PendingRequestProcessor` - issues invoices for PENDING requests
//! - `FailedRequestRecoverer` - requeues FAILED requests with retries left
//! - `PendingInvoiceChecker` - polls the provider for recently issued invoices
//! - `ExpirySweeper` - expires PENDING payments past their expiry
//!
//! Each job implements [`ScheduledJob`]: `run_once` processes one batch and
//! `run` loops until the shutdown channel flips to `true`.
//! [`SchedulerSupervisor`] owns the spawned tasks.

mod config;
mod expiry_sweeper;
mod failed_requests;
mod pending_invoices;
mod pending_requests;
mod supervisor;

pub use config::SchedulerConfig;
pub use expiry_sweeper::ExpirySweeper;
pub use failed_requests::FailedRequestRecoverer;
pub use pending_invoices::PendingInvoiceChecker;
pub use pending_requests::PendingRequestProcessor;
pub use supervisor::SchedulerSupervisor;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::sleep;

use crate::domain::foundation::DomainError;

/// When a job runs and how it reacts to a failed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Wait after a successful iteration.
    pub interval: Duration,

    /// Wait after an iteration that returned an error.
    pub error_backoff: Duration,

    /// Wait before the first iteration.
    pub initial_delay: Duration,
}

impl Schedule {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            error_backoff: interval,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Wait one full interval before the first run, like a ticker.
    pub fn delayed_start(mut self) -> Self {
        self.initial_delay = self.interval;
        self
    }
}

/// A background polling job.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn schedule(&self) -> Schedule;

    /// Process one batch; returns how many items were acted on.
    ///
    /// Only a failure to fetch the batch is an error. Failures on single
    /// items are logged and the batch continues.
    async fn run_once(&self) -> Result<usize, DomainError>;

    /// Run until shutdown is signalled.
    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let schedule = self.schedule();
        tracing::info!(job = self.name(), interval_ms = schedule.interval.as_millis() as u64, "Scheduler started");

        if !schedule.initial_delay.is_zero() && wait_or_shutdown(&mut shutdown, schedule.initial_delay).await {
            tracing::info!(job = self.name(), "Scheduler stopped");
            return;
        }

        loop {
            let wait = match self.run_once().await {
                Ok(processed) => {
                    if processed > 0 {
                        tracing::debug!(job = self.name(), processed, "Scheduler iteration finished");
                    }
                    schedule.interval
                }
                Err(err) => {
                    tracing::warn!(
                        job = self.name(),
                        error = %err,
                        backoff_ms = schedule.error_backoff.as_millis() as u64,
                        "Scheduler iteration failed"
                    );
                    schedule.error_backoff
                }
            };

            if wait_or_shutdown(&mut shutdown, wait).await {
                tracing::info!(job = self.name(), "Scheduler stopped");
                return;
            }
        }
    }
}

/// Sleep for `duration`; returns `true` if shutdown was requested meanwhile.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    if *shutdown.borrow() {
        return true;
    }

    let deadline = sleep(duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                // A dropped sender also means stop.
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
            _ = &mut deadline => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingJob {
        runs: AtomicUsize,
        fail: bool,
        schedule: Schedule,
    }

    #[async_trait]
    impl ScheduledJob for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn schedule(&self) -> Schedule {
            self.schedule
        }

        async fn run_once(&self) -> Result<usize, DomainError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DomainError::database("down"))
            } else {
                Ok(1)
            }
        }
    }

    fn job(schedule: Schedule, fail: bool) -> Arc<CountingJob> {
        Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
            fail,
            schedule,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_every_interval() {
        let job = job(Schedule::every(Duration::from_secs(5)), false);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let job = job.clone();
            async move { job.run(rx).await }
        });

        tokio::time::sleep(Duration::from_millis(12_500)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 3); // t = 0, 5, 10

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_iterations_use_error_backoff() {
        let job = job(
            Schedule::every(Duration::from_secs(5)).with_error_backoff(Duration::from_secs(10)),
            true,
        );
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let job = job.clone();
            async move { job.run(rx).await }
        });

        tokio::time::sleep(Duration::from_millis(12_500)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 2); // t = 0, 10

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_start_waits_one_interval() {
        let job = job(Schedule::every(Duration::from_secs(600)).delayed_start(), false);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let job = job.clone();
            async move { job.run(rx).await }
        });

        tokio::time::sleep(Duration::from_secs(599)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_sender_stops_the_loop() {
        let job = job(Schedule::every(Duration::from_secs(5)), false);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let job = job.clone();
            async move { job.run(rx).await }
        });

        drop(tx);
        handle.await.unwrap();
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }
}
