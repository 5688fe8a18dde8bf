//! Expires PENDING payments whose invoice is past its expiry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::lifecycle::{PaymentLifecycleService, TransitionOutcome};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::PaymentRepository;

use super::{Schedule, ScheduledJob, SchedulerConfig};

pub struct ExpirySweeper {
    repository: Arc<dyn PaymentRepository>,
    lifecycle: Arc<PaymentLifecycleService>,
    schedule: Schedule,
}

impl ExpirySweeper {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        lifecycle: Arc<PaymentLifecycleService>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            repository,
            lifecycle,
            schedule: Schedule::every(config.expiry_interval)
                .with_error_backoff(config.expiry_error_backoff),
        }
    }
}

#[async_trait]
impl ScheduledJob for ExpirySweeper {
    fn name(&self) -> &'static str {
        "expiry_sweeper"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    async fn run_once(&self) -> Result<usize, DomainError> {
        let payments = self
            .repository
            .find_expired_pending_payments(Timestamp::now())
            .await?;
        let mut expired = 0;

        for payment in &payments {
            match self.lifecycle.process_payment_expired(payment).await {
                Ok(TransitionOutcome::Applied) => expired += 1,
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(
                        order_id = %payment.order_id,
                        payment_id = %payment.id,
                        error = %err,
                        "Failed to expire payment"
                    );
                }
            }
        }

        Ok(expired)
    }
}
