//! InvoiceIssuer - turns one PENDING payment request into an issued invoice.
//!
//! Shared by the pending-request scheduler and by the order-created handler
//! when invoices are created directly.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{
    AuditActor, AuditEvent, ExternalId, NewPayment, Payment, PaymentAuditLog, PaymentError,
    PaymentRequest,
};
use crate::ports::{CreateInvoiceRequest, InvoiceProvider, PaymentRepository, UserDirectory};

/// Default invoice description prefix; the order id is appended.
pub const DEFAULT_DESCRIPTION_PREFIX: &str = "[FC] Pembayaran Order";

/// What happened to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    /// A new invoice was created and its payment stored.
    Issued(Payment),
    /// A payment already existed for the order; the request was closed.
    AlreadyIssued,
    /// The request was marked FAILED with the given notes.
    Failed(String),
}

pub struct InvoiceIssuer {
    repository: Arc<dyn PaymentRepository>,
    invoice_provider: Arc<dyn InvoiceProvider>,
    user_directory: Arc<dyn UserDirectory>,
    description_prefix: String,
}

impl InvoiceIssuer {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        invoice_provider: Arc<dyn InvoiceProvider>,
        user_directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            repository,
            invoice_provider,
            user_directory,
            description_prefix: DEFAULT_DESCRIPTION_PREFIX.to_string(),
        }
    }

    pub fn with_description_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.description_prefix = prefix.into();
        self
    }

    /// Process one PENDING request.
    ///
    /// Provider and user-service failures mark the request FAILED so the
    /// failed-request recoverer can pick it up; only storage errors are
    /// returned as `Err`.
    pub async fn issue(&self, request: &PaymentRequest) -> Result<IssueOutcome, PaymentError> {
        if self
            .repository
            .find_payment_by_order(request.order_id)
            .await?
            .is_some()
        {
            tracing::debug!(
                request_id = %request.id,
                order_id = %request.order_id,
                "Payment already exists, closing request"
            );
            self.repository.mark_request_success(request.id).await?;
            return Ok(IssueOutcome::AlreadyIssued);
        }

        let user = match self.user_directory.user_info(request.user_id).await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(
                    request_id = %request.id,
                    user_id = %request.user_id,
                    error = %err,
                    "User lookup failed"
                );
                return self.fail(request, err.to_string()).await;
            }
        };

        let external_id = ExternalId::for_order(request.order_id);
        let created = self
            .invoice_provider
            .create_invoice(CreateInvoiceRequest {
                external_id: external_id.to_string(),
                amount: request.amount,
                description: format!("{} {}", self.description_prefix, request.order_id),
                payer_email: user.email,
            })
            .await;

        let audit = PaymentAuditLog::new(
            request.order_id,
            AuditEvent::CreateInvoice,
            AuditActor::InvoiceProvider,
        )
        .with_user(request.user_id)
        .with_external_id(external_id.clone());
        if let Err(err) = self.repository.insert_audit_log(audit).await {
            tracing::warn!(order_id = %request.order_id, error = %err, "Failed to write audit log");
        }

        let invoice = match created {
            Ok(invoice) => invoice,
            Err(err) => {
                tracing::warn!(
                    request_id = %request.id,
                    order_id = %request.order_id,
                    error = %err,
                    "Invoice creation failed"
                );
                return self.fail(request, err.message).await;
            }
        };

        let payment = NewPayment::from_request(request, Timestamp::from_datetime(invoice.expiry_date));
        let payment = match self.repository.save_payment(payment).await {
            Ok(payment) => payment,
            Err(err) => {
                tracing::error!(
                    request_id = %request.id,
                    order_id = %request.order_id,
                    invoice_id = %invoice.id,
                    error = %err,
                    "Invoice created but payment could not be stored"
                );
                self.fail(request, err.to_string()).await?;
                return Err(err.into());
            }
        };

        self.repository.mark_request_success(request.id).await?;
        tracing::info!(
            request_id = %request.id,
            order_id = %request.order_id,
            invoice_id = %invoice.id,
            "Invoice issued"
        );
        Ok(IssueOutcome::Issued(payment))
    }

    async fn fail(
        &self,
        request: &PaymentRequest,
        notes: String,
    ) -> Result<IssueOutcome, PaymentError> {
        self.repository
            .mark_request_failed(request.id, &notes)
            .await?;
        Ok(IssueOutcome::Failed(notes))
    }
}
