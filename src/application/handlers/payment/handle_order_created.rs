//! HandleOrderCreatedHandler - turns order-created events into payment requests.

use std::sync::Arc;

use crate::application::invoicing::{InvoiceIssuer, IssueOutcome};
use crate::application::lifecycle::PaymentLifecycleService;
use crate::domain::payment::{NewPaymentRequest, OrderCreatedEvent, PaymentError, PaymentRequest};

/// Result of handling one order-created event.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleOrderCreatedResult {
    pub request: PaymentRequest,
    /// Set when invoices are issued directly instead of by the scheduler.
    pub issued: Option<IssueOutcome>,
}

pub struct HandleOrderCreatedHandler {
    lifecycle: Arc<PaymentLifecycleService>,
    direct_issuer: Option<Arc<InvoiceIssuer>>,
}

impl HandleOrderCreatedHandler {
    /// Save requests only; the pending-request scheduler issues invoices.
    pub fn new(lifecycle: Arc<PaymentLifecycleService>) -> Self {
        Self {
            lifecycle,
            direct_issuer: None,
        }
    }

    /// Issue the invoice right after saving the request.
    pub fn with_direct_invoicing(mut self, issuer: Arc<InvoiceIssuer>) -> Self {
        self.direct_issuer = Some(issuer);
        self
    }

    pub async fn handle(
        &self,
        event: OrderCreatedEvent,
    ) -> Result<HandleOrderCreatedResult, PaymentError> {
        let request = self
            .lifecycle
            .save_payment_request(NewPaymentRequest {
                order_id: event.order_id,
                user_id: event.user_id,
                amount: event.total_amount,
            })
            .await?;

        tracing::info!(
            order_id = %request.order_id,
            request_id = %request.id,
            amount = %request.amount,
            "Payment request saved"
        );

        let issued = match &self.direct_issuer {
            Some(issuer) => Some(issuer.issue(&request).await?),
            None => None,
        };

        Ok(HandleOrderCreatedResult { request, issued })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::storage::InMemoryPaymentRepository;
    use crate::adapters::user_service::StaticUserDirectory;
    use crate::adapters::xendit::MockInvoiceProvider;
    use crate::domain::foundation::{OrderId, UserId};
    use crate::domain::payment::{AuditEvent, PaymentRequestStatus};
    use rust_decimal_macros::dec;

    fn event(order: i64) -> OrderCreatedEvent {
        OrderCreatedEvent {
            order_id: OrderId::new(order),
            user_id: UserId::new(9),
            total_amount: dec!(250.50),
            payment_method: "invoice".to_string(),
            shipping_address: "Jl. Sudirman 1".to_string(),
        }
    }

    fn lifecycle(repo: &Arc<InMemoryPaymentRepository>) -> Arc<PaymentLifecycleService> {
        Arc::new(PaymentLifecycleService::new(
            repo.clone(),
            Arc::new(InMemoryEventBus::new()),
        ))
    }

    #[tokio::test]
    async fn saves_pending_request_by_default() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let handler = HandleOrderCreatedHandler::new(lifecycle(&repo));

        let result = handler.handle(event(11)).await.unwrap();

        assert_eq!(result.issued, None);
        assert_eq!(result.request.status, PaymentRequestStatus::Pending);
        assert_eq!(result.request.amount, dec!(250.50));
        assert_eq!(result.request.retry_count, 0);
        assert!(repo.payments().await.is_empty());
        assert_eq!(repo.audit_logs().await[0].event, AuditEvent::SavePaymentRequest);
    }

    #[tokio::test]
    async fn direct_mode_issues_invoice_immediately() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let provider = MockInvoiceProvider::new();
        let issuer = InvoiceIssuer::new(
            repo.clone(),
            Arc::new(provider.clone()),
            Arc::new(StaticUserDirectory::with_fallback_email("buyer@example.com")),
        );
        let handler =
            HandleOrderCreatedHandler::new(lifecycle(&repo)).with_direct_invoicing(Arc::new(issuer));

        let result = handler.handle(event(11)).await.unwrap();

        assert!(matches!(result.issued, Some(IssueOutcome::Issued(_))));
        assert_eq!(provider.call_count("create_invoice"), 1);
        assert_eq!(
            repo.request(result.request.id).await.unwrap().status,
            PaymentRequestStatus::Success
        );
    }

    #[tokio::test]
    async fn storage_failure_is_returned() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        repo.fail_on("save_payment_request").await;
        let handler = HandleOrderCreatedHandler::new(lifecycle(&repo));

        let err = handler.handle(event(11)).await.unwrap_err();

        assert!(matches!(err, PaymentError::Infrastructure(_)));
    }
}
