//! In-Memory Payment Repository
//!
//! Keeps payments, payment requests and their records in memory.
//! Used by the test suite and for running the service without a database.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PaymentId, PaymentRequestId, Timestamp,
};
use crate::domain::payment::{
    FailedEvent, NewPayment, NewPaymentRequest, Payment, PaymentAnomaly, PaymentAuditLog,
    PaymentRequest, PaymentRequestStatus, PaymentStatus,
};
use crate::ports::PaymentRepository;

#[derive(Debug, Default)]
struct Tables {
    requests: Vec<PaymentRequest>,
    payments: Vec<Payment>,
    audit_logs: Vec<PaymentAuditLog>,
    anomalies: Vec<PaymentAnomaly>,
    failed_events: Vec<FailedEvent>,
    next_request_id: i64,
    next_payment_id: i64,
}

/// In-memory payment repository.
///
/// Operations named through [`InMemoryPaymentRepository::fail_on`] return a
/// database error, which lets tests exercise the failure paths of callers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRepository {
    tables: Arc<RwLock<Tables>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryPaymentRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail until cleared
    pub async fn fail_on(&self, operation: &str) {
        self.failing.write().await.insert(operation.to_string());
    }

    /// Stop injecting failures
    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
    }

    /// Insert a request as-is, assigning an id if it has none
    pub async fn insert_request(&self, mut request: PaymentRequest) -> PaymentRequest {
        let mut tables = self.tables.write().await;
        if request.id.as_i64() == 0 {
            tables.next_request_id += 1;
            request.id = PaymentRequestId::new(tables.next_request_id);
        }
        tables.requests.push(request.clone());
        request
    }

    /// Insert a payment as-is, assigning an id if it has none
    pub async fn insert_payment(&self, mut payment: Payment) -> Payment {
        let mut tables = self.tables.write().await;
        if payment.id.as_i64() == 0 {
            tables.next_payment_id += 1;
            payment.id = PaymentId::new(tables.next_payment_id);
        }
        tables.payments.push(payment.clone());
        payment
    }

    pub async fn requests(&self) -> Vec<PaymentRequest> {
        self.tables.read().await.requests.clone()
    }

    pub async fn request(&self, id: PaymentRequestId) -> Option<PaymentRequest> {
        self.tables
            .read()
            .await
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.tables.read().await.payments.clone()
    }

    pub async fn audit_logs(&self) -> Vec<PaymentAuditLog> {
        self.tables.read().await.audit_logs.clone()
    }

    pub async fn anomalies(&self) -> Vec<PaymentAnomaly> {
        self.tables.read().await.anomalies.clone()
    }

    pub async fn failed_events(&self) -> Vec<FailedEvent> {
        self.tables.read().await.failed_events.clone()
    }

    async fn check(&self, operation: &str) -> Result<(), DomainError> {
        if self.failing.read().await.contains(operation) {
            return Err(DomainError::database(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }
}

fn request_not_found(id: PaymentRequestId) -> DomainError {
    DomainError::new(
        ErrorCode::PaymentRequestNotFound,
        format!("Payment request {} not found", id),
    )
}

fn oldest_first(mut requests: Vec<PaymentRequest>, limit: Option<u32>) -> Vec<PaymentRequest> {
    requests.sort_by_key(|r| (r.create_time, r.id));
    if let Some(limit) = limit {
        requests.truncate(limit as usize);
    }
    requests
}

impl Tables {
    fn request_mut(&mut self, id: PaymentRequestId) -> Result<&mut PaymentRequest, DomainError> {
        self.requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| request_not_found(id))
    }

    fn transition_payment<F>(&mut self, matches: F, to: PaymentStatus) -> bool
    where
        F: Fn(&Payment) -> bool,
    {
        match self
            .payments
            .iter_mut()
            .rev()
            .find(|p| matches(p) && p.status == PaymentStatus::Pending)
        {
            Some(payment) => {
                payment.status = to;
                payment.update_time = Timestamp::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save_payment_request(
        &self,
        request: NewPaymentRequest,
    ) -> Result<PaymentRequest, DomainError> {
        self.check("save_payment_request").await?;
        let mut tables = self.tables.write().await;
        tables.next_request_id += 1;
        let now = Timestamp::now();
        let saved = PaymentRequest {
            id: PaymentRequestId::new(tables.next_request_id),
            order_id: request.order_id,
            user_id: request.user_id,
            amount: request.amount,
            status: PaymentRequestStatus::Pending,
            retry_count: 0,
            notes: None,
            create_time: now,
            update_time: now,
        };
        tables.requests.push(saved.clone());
        Ok(saved)
    }

    async fn find_pending_requests(&self, limit: u32) -> Result<Vec<PaymentRequest>, DomainError> {
        self.check("find_pending_requests").await?;
        let tables = self.tables.read().await;
        let pending = tables
            .requests
            .iter()
            .filter(|r| r.status == PaymentRequestStatus::Pending)
            .cloned()
            .collect();
        Ok(oldest_first(pending, Some(limit)))
    }

    async fn find_retryable_failed_requests(
        &self,
        max_retry: u32,
        limit: u32,
    ) -> Result<Vec<PaymentRequest>, DomainError> {
        self.check("find_retryable_failed_requests").await?;
        let tables = self.tables.read().await;
        let failed = tables
            .requests
            .iter()
            .filter(|r| r.is_retryable(max_retry))
            .cloned()
            .collect();
        Ok(oldest_first(failed, Some(limit)))
    }

    async fn find_exhausted_requests(
        &self,
        max_retry: u32,
    ) -> Result<Vec<PaymentRequest>, DomainError> {
        self.check("find_exhausted_requests").await?;
        let tables = self.tables.read().await;
        let exhausted = tables
            .requests
            .iter()
            .filter(|r| r.is_exhausted(max_retry))
            .cloned()
            .collect();
        Ok(oldest_first(exhausted, None))
    }

    async fn mark_request_success(&self, id: PaymentRequestId) -> Result<(), DomainError> {
        self.check("mark_request_success").await?;
        let mut tables = self.tables.write().await;
        let request = tables.request_mut(id)?;
        request.status = PaymentRequestStatus::Success;
        request.update_time = Timestamp::now();
        Ok(())
    }

    async fn mark_request_failed(
        &self,
        id: PaymentRequestId,
        notes: &str,
    ) -> Result<(), DomainError> {
        self.check("mark_request_failed").await?;
        let mut tables = self.tables.write().await;
        let request = tables.request_mut(id)?;
        request.status = PaymentRequestStatus::Failed;
        request.notes = Some(notes.to_string());
        request.update_time = Timestamp::now();
        Ok(())
    }

    async fn requeue_failed_request(&self, id: PaymentRequestId) -> Result<bool, DomainError> {
        self.check("requeue_failed_request").await?;
        let mut tables = self.tables.write().await;
        let request = tables.request_mut(id)?;
        if request.status != PaymentRequestStatus::Failed {
            return Ok(false);
        }
        request.status = PaymentRequestStatus::Pending;
        request.retry_count += 1;
        request.update_time = Timestamp::now();
        Ok(true)
    }

    async fn record_request_retry_failure(
        &self,
        id: PaymentRequestId,
        notes: &str,
    ) -> Result<(), DomainError> {
        self.check("record_request_retry_failure").await?;
        let mut tables = self.tables.write().await;
        let request = tables.request_mut(id)?;
        request.status = PaymentRequestStatus::Failed;
        request.notes = Some(notes.to_string());
        request.retry_count += 1;
        request.update_time = Timestamp::now();
        Ok(())
    }

    async fn save_payment(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        self.check("save_payment").await?;
        let mut tables = self.tables.write().await;
        tables.next_payment_id += 1;
        let now = Timestamp::now();
        let saved = Payment {
            id: PaymentId::new(tables.next_payment_id),
            order_id: payment.order_id,
            user_id: payment.user_id,
            external_id: payment.external_id,
            amount: payment.amount,
            status: PaymentStatus::Pending,
            create_time: now,
            update_time: now,
            expired_time: payment.expired_time,
        };
        tables.payments.push(saved.clone());
        Ok(saved)
    }

    async fn find_payment_by_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, DomainError> {
        self.check("find_payment_by_order").await?;
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .iter()
            .rev()
            .find(|p| p.order_id == order_id)
            .cloned())
    }

    async fn find_pending_payments_since(
        &self,
        since: Timestamp,
    ) -> Result<Vec<Payment>, DomainError> {
        self.check("find_pending_payments_since").await?;
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending && !p.create_time.is_before(&since))
            .cloned()
            .collect())
    }

    async fn find_expired_pending_payments(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Payment>, DomainError> {
        self.check("find_expired_pending_payments").await?;
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending && p.is_expired_at(&now))
            .cloned()
            .collect())
    }

    async fn mark_paid(&self, order_id: OrderId) -> Result<bool, DomainError> {
        self.check("mark_paid").await?;
        let mut tables = self.tables.write().await;
        Ok(tables.transition_payment(|p| p.order_id == order_id, PaymentStatus::Paid))
    }

    async fn mark_failed(&self, order_id: OrderId) -> Result<bool, DomainError> {
        self.check("mark_failed").await?;
        let mut tables = self.tables.write().await;
        Ok(tables.transition_payment(|p| p.order_id == order_id, PaymentStatus::Failed))
    }

    async fn mark_expired(&self, payment_id: PaymentId) -> Result<bool, DomainError> {
        self.check("mark_expired").await?;
        let mut tables = self.tables.write().await;
        Ok(tables.transition_payment(|p| p.id == payment_id, PaymentStatus::Expired))
    }

    async fn insert_audit_log(&self, entry: PaymentAuditLog) -> Result<(), DomainError> {
        self.check("insert_audit_log").await?;
        self.tables.write().await.audit_logs.push(entry);
        Ok(())
    }

    async fn audit_logs_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<PaymentAuditLog>, DomainError> {
        self.check("audit_logs_for_order").await?;
        let tables = self.tables.read().await;
        Ok(tables
            .audit_logs
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn save_payment_anomaly(&self, anomaly: PaymentAnomaly) -> Result<(), DomainError> {
        self.check("save_payment_anomaly").await?;
        self.tables.write().await.anomalies.push(anomaly);
        Ok(())
    }

    async fn save_failed_event(&self, event: FailedEvent) -> Result<(), DomainError> {
        self.check("save_failed_event").await?;
        self.tables.write().await.failed_events.push(event);
        Ok(())
    }
}
