//! DownloadInvoiceHandler - renders the invoice document of an order.

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::lifecycle::PaymentLifecycleService;
use crate::domain::foundation::OrderId;
use crate::domain::payment::PaymentError;
use crate::ports::InvoiceDocumentGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadInvoiceQuery {
    pub order_id: OrderId,
}

pub struct DownloadInvoiceHandler {
    lifecycle: Arc<PaymentLifecycleService>,
    generator: Arc<dyn InvoiceDocumentGenerator>,
}

impl DownloadInvoiceHandler {
    pub fn new(
        lifecycle: Arc<PaymentLifecycleService>,
        generator: Arc<dyn InvoiceDocumentGenerator>,
    ) -> Self {
        Self {
            lifecycle,
            generator,
        }
    }

    /// Returns the path of the generated document.
    pub async fn handle(&self, query: DownloadInvoiceQuery) -> Result<PathBuf, PaymentError> {
        let payment = self.lifecycle.payment_by_order(query.order_id).await?;
        let path = self.generator.generate(&payment).await?;
        tracing::debug!(order_id = %query.order_id, path = %path.display(), "Invoice document generated");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::document::LocalInvoiceDocumentGenerator;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::storage::InMemoryPaymentRepository;
    use crate::domain::foundation::{PaymentId, Timestamp, UserId};
    use crate::domain::payment::{ExternalId, Payment, PaymentStatus};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn handler(repo: &Arc<InMemoryPaymentRepository>, dir: &TempDir) -> DownloadInvoiceHandler {
        DownloadInvoiceHandler::new(
            Arc::new(PaymentLifecycleService::new(
                repo.clone(),
                Arc::new(InMemoryEventBus::new()),
            )),
            Arc::new(LocalInvoiceDocumentGenerator::new(dir.path())),
        )
    }

    #[tokio::test]
    async fn writes_invoice_for_existing_payment() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let now = Timestamp::now();
        repo.insert_payment(Payment {
            id: PaymentId::new(0),
            order_id: OrderId::new(77),
            user_id: UserId::new(1),
            external_id: ExternalId::for_order(OrderId::new(77)),
            amount: dec!(120),
            status: PaymentStatus::Paid,
            create_time: now,
            update_time: now,
            expired_time: now.plus_hours(24),
        })
        .await;

        let path = handler(&repo, &dir)
            .handle(DownloadInvoiceQuery {
                order_id: OrderId::new(77),
            })
            .await
            .unwrap();

        assert!(path.ends_with("invoice_77.txt"));
        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("order-77"));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(InMemoryPaymentRepository::new());

        let err = handler(&repo, &dir)
            .handle(DownloadInvoiceQuery {
                order_id: OrderId::new(1),
            })
            .await
            .unwrap_err();

        assert_eq!(err, PaymentError::PaymentNotFound(OrderId::new(1)));
    }
}
