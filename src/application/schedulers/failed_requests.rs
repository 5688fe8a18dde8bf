//! Requeues FAILED payment requests that still have retries left.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::PaymentRepository;

use super::{Schedule, ScheduledJob, SchedulerConfig};

pub struct FailedRequestRecoverer {
    repository: Arc<dyn PaymentRepository>,
    batch_size: u32,
    max_retry: u32,
    schedule: Schedule,
}

impl FailedRequestRecoverer {
    pub fn new(repository: Arc<dyn PaymentRepository>, config: &SchedulerConfig) -> Self {
        Self {
            repository,
            batch_size: config.failed_requests_batch,
            max_retry: config.max_request_retries,
            schedule: Schedule::every(config.failed_requests_interval)
                .with_error_backoff(config.fetch_error_backoff),
        }
    }
}

#[async_trait]
impl ScheduledJob for FailedRequestRecoverer {
    fn name(&self) -> &'static str {
        "failed_requests"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    async fn run_once(&self) -> Result<usize, DomainError> {
        let requests = self
            .repository
            .find_retryable_failed_requests(self.max_retry, self.batch_size)
            .await?;
        let mut requeued = 0;

        for request in &requests {
            match self.repository.requeue_failed_request(request.id).await {
                Ok(true) => {
                    requeued += 1;
                    tracing::info!(
                        request_id = %request.id,
                        retry_count = request.retry_count + 1,
                        "Payment request requeued"
                    );
                }
                Ok(false) => {
                    tracing::debug!(request_id = %request.id, "Request no longer FAILED, skipping");
                }
                Err(err) => {
                    tracing::warn!(request_id = %request.id, error = %err, "Requeue failed");
                    if let Err(err) = self
                        .repository
                        .record_request_retry_failure(request.id, &err.message)
                        .await
                    {
                        tracing::error!(
                            request_id = %request.id,
                            error = %err,
                            "Failed to record retry failure"
                        );
                    }
                }
            }
        }

        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryPaymentRepository;
    use crate::domain::foundation::{OrderId, PaymentRequestId, Timestamp, UserId};
    use crate::domain::payment::{PaymentRequest, PaymentRequestStatus};
    use rust_decimal_macros::dec;

    async fn failed_request(repo: &InMemoryPaymentRepository, order: i64, retries: u32) -> PaymentRequest {
        let now = Timestamp::now();
        repo.insert_request(PaymentRequest {
            id: PaymentRequestId::new(0),
            order_id: OrderId::new(order),
            user_id: UserId::new(1),
            amount: dec!(100),
            status: PaymentRequestStatus::Failed,
            retry_count: retries,
            notes: Some("provider down".to_string()),
            create_time: now,
            update_time: now,
        })
        .await
    }

    #[tokio::test]
    async fn requeues_requests_within_retry_budget() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let retryable = failed_request(&repo, 1, 3).await;
        let exhausted = failed_request(&repo, 2, 4).await;
        let recoverer = FailedRequestRecoverer::new(repo.clone(), &SchedulerConfig::default());

        assert_eq!(recoverer.run_once().await.unwrap(), 1);

        let retried = repo.request(retryable.id).await.unwrap();
        assert_eq!(retried.status, PaymentRequestStatus::Pending);
        assert_eq!(retried.retry_count, 4);
        let untouched = repo.request(exhausted.id).await.unwrap();
        assert_eq!(untouched.status, PaymentRequestStatus::Failed);
        assert_eq!(untouched.retry_count, 4);
    }

    #[tokio::test]
    async fn requeue_error_counts_the_retry() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let request = failed_request(&repo, 1, 0).await;
        repo.fail_on("requeue_failed_request").await;
        let recoverer = FailedRequestRecoverer::new(repo.clone(), &SchedulerConfig::default());

        assert_eq!(recoverer.run_once().await.unwrap(), 0);

        let stored = repo.request(request.id).await.unwrap();
        assert_eq!(stored.status, PaymentRequestStatus::Failed);
        assert_eq!(stored.retry_count, 1);
    }

    #[tokio::test]
    async fn empty_table_is_a_quiet_iteration() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let recoverer = FailedRequestRecoverer::new(repo, &SchedulerConfig::default());

        assert_eq!(recoverer.run_once().await.unwrap(), 0);
    }
}
