//! Polls the invoicing provider for recently issued, still PENDING invoices.
//!
//! Catches payments whose webhook never arrived.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::lifecycle::PaymentLifecycleService;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{InvoiceProvider, PaymentRepository};

use super::{Schedule, ScheduledJob, SchedulerConfig};

pub struct PendingInvoiceChecker {
    repository: Arc<dyn PaymentRepository>,
    invoice_provider: Arc<dyn InvoiceProvider>,
    lifecycle: Arc<PaymentLifecycleService>,
    lookback: Duration,
    schedule: Schedule,
}

impl PendingInvoiceChecker {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        invoice_provider: Arc<dyn InvoiceProvider>,
        lifecycle: Arc<PaymentLifecycleService>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            repository,
            invoice_provider,
            lifecycle,
            lookback: config.pending_invoices_lookback,
            schedule: Schedule::every(config.pending_invoices_interval).delayed_start(),
        }
    }
}

#[async_trait]
impl ScheduledJob for PendingInvoiceChecker {
    fn name(&self) -> &'static str {
        "pending_invoices"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    async fn run_once(&self) -> Result<usize, DomainError> {
        let since = Timestamp::now().minus(self.lookback);
        let payments = self.repository.find_pending_payments_since(since).await?;
        let mut settled = 0;

        for payment in &payments {
            let status = match self.invoice_provider.invoice_status(&payment.external_id).await {
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!(
                        order_id = %payment.order_id,
                        external_id = %payment.external_id,
                        error = %err,
                        "Invoice status check failed"
                    );
                    continue;
                }
            };

            if !status.is_paid() {
                continue;
            }

            match self.lifecycle.process_payment_success(payment.order_id).await {
                Ok(_) => settled += 1,
                Err(err) => {
                    tracing::error!(
                        order_id = %payment.order_id,
                        error = %err,
                        "Failed to settle paid invoice"
                    );
                }
            }
        }

        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::storage::InMemoryPaymentRepository;
    use crate::adapters::xendit::MockInvoiceProvider;
    use crate::application::retry::RetryPolicy;
    use crate::domain::foundation::{OrderId, PaymentId, UserId};
    use crate::domain::payment::{ExternalId, Payment, PaymentStatus};
    use crate::ports::{InvoiceProviderError, InvoiceStatus};
    use rust_decimal_macros::dec;

    struct Fixture {
        repo: Arc<InMemoryPaymentRepository>,
        provider: MockInvoiceProvider,
        checker: PendingInvoiceChecker,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let provider = MockInvoiceProvider::new();
        let lifecycle = PaymentLifecycleService::new(repo.clone(), Arc::new(InMemoryEventBus::new()))
            .with_retry_policy(RetryPolicy::immediate(1));
        let checker = PendingInvoiceChecker::new(
            repo.clone(),
            Arc::new(provider.clone()),
            Arc::new(lifecycle),
            &SchedulerConfig::default(),
        );
        Fixture {
            repo,
            provider,
            checker,
        }
    }

    async fn pending_payment(repo: &InMemoryPaymentRepository, order: i64, age_hours: i64) -> Payment {
        let created = Timestamp::now().minus_hours(age_hours);
        repo.insert_payment(Payment {
            id: PaymentId::new(0),
            order_id: OrderId::new(order),
            user_id: UserId::new(1),
            external_id: ExternalId::for_order(OrderId::new(order)),
            amount: dec!(100),
            status: PaymentStatus::Pending,
            create_time: created,
            update_time: created,
            expired_time: created.plus_hours(24),
        })
        .await
    }

    #[tokio::test]
    async fn paid_invoices_are_settled() {
        let f = fixture();
        pending_payment(&f.repo, 1, 1).await;
        pending_payment(&f.repo, 2, 1).await;
        f.provider.set_status("order-1", InvoiceStatus::Paid);
        f.provider.set_status("order-2", InvoiceStatus::Pending);

        assert_eq!(f.checker.run_once().await.unwrap(), 1);

        let statuses: Vec<_> = f.repo.payments().await.into_iter().map(|p| p.status).collect();
        assert_eq!(statuses, vec![PaymentStatus::Paid, PaymentStatus::Pending]);
    }

    #[tokio::test]
    async fn payments_older_than_lookback_are_ignored() {
        let f = fixture();
        pending_payment(&f.repo, 1, 30).await;
        f.provider.set_status("order-1", InvoiceStatus::Paid);

        assert_eq!(f.checker.run_once().await.unwrap(), 0);
        assert_eq!(f.provider.call_count("invoice_status"), 0);
    }

    #[tokio::test]
    async fn provider_errors_skip_single_payments() {
        let f = fixture();
        pending_payment(&f.repo, 1, 1).await;
        pending_payment(&f.repo, 2, 1).await;
        f.provider.set_status("order-2", InvoiceStatus::Paid);
        f.provider.set_error(InvoiceProviderError::network("reset"));

        assert_eq!(f.checker.run_once().await.unwrap(), 1);
        assert_eq!(f.provider.call_count("invoice_status"), 2);
    }

    #[test]
    fn first_check_waits_one_interval() {
        let f = fixture();
        let schedule = f.checker.schedule();
        assert_eq!(schedule.initial_delay, Duration::from_secs(600));
    }
}
