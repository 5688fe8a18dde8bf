//! PaymentRepository port - persistence gateway for the payment engine.
//!
//! All status changes are narrow per-row conditional updates so that
//! concurrently running schedulers and webhook handlers never overwrite a
//! terminal state. `mark_*` methods return `true` only if the row actually
//! transitioned.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, PaymentId, PaymentRequestId, Timestamp};
use crate::domain::payment::{
    FailedEvent, NewPayment, NewPaymentRequest, Payment, PaymentAnomaly, PaymentAuditLog,
    PaymentRequest,
};

/// Port for storing payments, payment requests and their records.
///
/// Implementations must be safe for concurrent use from every scheduler.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    // === Payment requests ===

    /// Insert a new PENDING payment request.
    async fn save_payment_request(
        &self,
        request: NewPaymentRequest,
    ) -> Result<PaymentRequest, DomainError>;

    /// PENDING requests, oldest first.
    async fn find_pending_requests(&self, limit: u32) -> Result<Vec<PaymentRequest>, DomainError>;

    /// FAILED requests with `retry_count <= max_retry`, oldest first.
    async fn find_retryable_failed_requests(
        &self,
        max_retry: u32,
        limit: u32,
    ) -> Result<Vec<PaymentRequest>, DomainError>;

    /// FAILED requests with `retry_count > max_retry`, oldest first.
    async fn find_exhausted_requests(
        &self,
        max_retry: u32,
    ) -> Result<Vec<PaymentRequest>, DomainError>;

    /// Mark a request SUCCESS.
    async fn mark_request_success(&self, id: PaymentRequestId) -> Result<(), DomainError>;

    /// Mark a request FAILED with notes; the retry counter is left unchanged.
    async fn mark_request_failed(
        &self,
        id: PaymentRequestId,
        notes: &str,
    ) -> Result<(), DomainError>;

    /// Move a FAILED request back to PENDING and count the retry.
    ///
    /// Returns `false` if the request was no longer FAILED.
    async fn requeue_failed_request(&self, id: PaymentRequestId) -> Result<bool, DomainError>;

    /// Keep a request FAILED, record notes and count the retry.
    async fn record_request_retry_failure(
        &self,
        id: PaymentRequestId,
        notes: &str,
    ) -> Result<(), DomainError>;

    // === Payments ===

    /// Insert a PENDING payment for an issued invoice.
    async fn save_payment(&self, payment: NewPayment) -> Result<Payment, DomainError>;

    /// Most recent payment for an order, if any.
    async fn find_payment_by_order(&self, order_id: OrderId)
        -> Result<Option<Payment>, DomainError>;

    /// PENDING payments created at or after `since`.
    async fn find_pending_payments_since(
        &self,
        since: Timestamp,
    ) -> Result<Vec<Payment>, DomainError>;

    /// PENDING payments whose expiry is at or before `now`.
    async fn find_expired_pending_payments(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Payment>, DomainError>;

    /// PENDING → PAID for the order's payment.
    async fn mark_paid(&self, order_id: OrderId) -> Result<bool, DomainError>;

    /// PENDING → FAILED for the order's payment.
    async fn mark_failed(&self, order_id: OrderId) -> Result<bool, DomainError>;

    /// PENDING → EXPIRED for one payment row.
    async fn mark_expired(&self, payment_id: PaymentId) -> Result<bool, DomainError>;

    // === Records ===

    /// Append an audit log entry.
    async fn insert_audit_log(&self, entry: PaymentAuditLog) -> Result<(), DomainError>;

    /// Audit trail of one order, oldest first.
    async fn audit_logs_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<PaymentAuditLog>, DomainError>;

    /// Record an amount anomaly.
    async fn save_payment_anomaly(&self, anomaly: PaymentAnomaly) -> Result<(), DomainError>;

    /// Dead-letter an undeliverable event.
    async fn save_failed_event(&self, event: FailedEvent) -> Result<(), DomainError>;
}
