//! Issues invoices for PENDING payment requests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::invoicing::{InvoiceIssuer, IssueOutcome};
use crate::domain::foundation::DomainError;
use crate::ports::PaymentRepository;

use super::{Schedule, ScheduledJob, SchedulerConfig};

pub struct PendingRequestProcessor {
    repository: Arc<dyn PaymentRepository>,
    issuer: Arc<InvoiceIssuer>,
    batch_size: u32,
    schedule: Schedule,
}

impl PendingRequestProcessor {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        issuer: Arc<InvoiceIssuer>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            repository,
            issuer,
            batch_size: config.pending_requests_batch,
            schedule: Schedule::every(config.pending_requests_interval)
                .with_error_backoff(config.fetch_error_backoff),
        }
    }
}

#[async_trait]
impl ScheduledJob for PendingRequestProcessor {
    fn name(&self) -> &'static str {
        "pending_requests"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    async fn run_once(&self) -> Result<usize, DomainError> {
        let requests = self.repository.find_pending_requests(self.batch_size).await?;
        let mut issued = 0;

        for request in &requests {
            match self.issuer.issue(request).await {
                Ok(IssueOutcome::Issued(_)) => issued += 1,
                Ok(IssueOutcome::AlreadyIssued) => {}
                Ok(IssueOutcome::Failed(notes)) => {
                    tracing::info!(request_id = %request.id, notes = %notes, "Payment request marked FAILED");
                }
                Err(err) => {
                    tracing::error!(request_id = %request.id, error = %err, "Failed to process payment request");
                }
            }
        }

        Ok(issued)
    }
}
