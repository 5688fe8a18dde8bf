//! PaymentLifecycleService - moves payments into their terminal states.
//!
//! Every transition follows the same shape: audit, publish the status update
//! with bounded retry, then apply a conditional `PENDING → terminal` update.
//! A payment is only marked PAID once its success event was published or
//! dead-lettered as a `FailedEvent`.

use std::sync::Arc;

use crate::domain::foundation::{OrderId, StateMachine};
use crate::domain::payment::{
    AuditActor, AuditEvent, FailedEvent, NewPaymentRequest, Payment, PaymentAnomaly,
    PaymentAuditLog, PaymentError, PaymentRequest, PaymentStatus, PaymentStatusUpdate,
};
use crate::ports::{PaymentEventPublisher, PaymentRepository};

use super::retry::{retry_with_backoff, RetryPolicy};

/// Result of asking for a terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The payment moved from PENDING to the requested state.
    Applied,
    /// The payment was already in the requested state; nothing changed.
    AlreadyApplied,
    /// The payment left PENDING for another state first; nothing changed.
    Skipped,
}

/// Core payment state transitions.
pub struct PaymentLifecycleService {
    repository: Arc<dyn PaymentRepository>,
    publisher: Arc<dyn PaymentEventPublisher>,
    retry_policy: RetryPolicy,
}

impl PaymentLifecycleService {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        publisher: Arc<dyn PaymentEventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Mark the order's payment PAID after announcing it downstream.
    ///
    /// Already PAID is a no-op. FAILED or EXPIRED payments are rejected
    /// without publishing anything. If publishing exhausts its retries the
    /// update is dead-lettered and the payment stays PENDING.
    pub async fn process_payment_success(
        &self,
        order_id: OrderId,
    ) -> Result<TransitionOutcome, PaymentError> {
        let payment = self.payment_by_order(order_id).await?;
        if payment.status == PaymentStatus::Paid {
            tracing::info!(order_id = %order_id, "Payment already PAID, skipping");
            return Ok(TransitionOutcome::AlreadyApplied);
        }
        ensure_transition(&payment, PaymentStatus::Paid)?;

        self.audit(&payment, AuditEvent::PublishPaymentStatus, AuditActor::Payment)
            .await;

        let update = PaymentStatusUpdate::paid(order_id);
        if let Err(err) = self.publish_with_retry(&update).await {
            tracing::error!(
                order_id = %order_id,
                error = %err,
                "Publishing PAID status exhausted retries, dead-lettering"
            );
            self.repository
                .save_failed_event(FailedEvent::payment_success(order_id, err.to_string()))
                .await?;
            self.audit(&payment, AuditEvent::PublishPaymentStatusFailed, AuditActor::Payment)
                .await;
            return Err(PaymentError::PublishFailed {
                order_id,
                reason: err.to_string(),
            });
        }

        if !self.repository.mark_paid(order_id).await? {
            return self.resolve_lost_race(order_id, PaymentStatus::Paid).await;
        }

        self.audit(&payment, AuditEvent::MarkPaid, AuditActor::Payment)
            .await;
        tracing::info!(order_id = %order_id, "Payment marked PAID");
        Ok(TransitionOutcome::Applied)
    }

    /// Mark the order's payment FAILED.
    ///
    /// Already FAILED is a no-op. Publishing is best effort: exhaustion is
    /// logged and the payment is still marked FAILED.
    pub async fn process_payment_failed(
        &self,
        order_id: OrderId,
    ) -> Result<TransitionOutcome, PaymentError> {
        let payment = self.payment_by_order(order_id).await?;
        if payment.status == PaymentStatus::Failed {
            tracing::info!(order_id = %order_id, "Payment already FAILED, skipping");
            return Ok(TransitionOutcome::AlreadyApplied);
        }
        ensure_transition(&payment, PaymentStatus::Failed)?;

        self.audit(&payment, AuditEvent::PublishPaymentStatus, AuditActor::Payment)
            .await;
        self.publish_best_effort(&payment, AuditActor::Payment).await;

        if !self.repository.mark_failed(order_id).await? {
            return self.resolve_lost_race(order_id, PaymentStatus::Failed).await;
        }

        self.audit(&payment, AuditEvent::MarkFailed, AuditActor::Payment)
            .await;
        tracing::info!(order_id = %order_id, "Payment marked FAILED");
        Ok(TransitionOutcome::Applied)
    }

    /// Expire a payment found past its expiry.
    ///
    /// The status is re-read right before acting; anything no longer
    /// PENDING is skipped so a concurrent PAID transition wins.
    pub async fn process_payment_expired(
        &self,
        candidate: &Payment,
    ) -> Result<TransitionOutcome, PaymentError> {
        let current = self.payment_by_order(candidate.order_id).await?;
        if current.id != candidate.id || current.status != PaymentStatus::Pending {
            tracing::debug!(
                order_id = %candidate.order_id,
                payment_id = %candidate.id,
                status = %current.status,
                "Payment no longer PENDING, not expiring"
            );
            return Ok(TransitionOutcome::Skipped);
        }

        self.publish_best_effort(&current, AuditActor::Scheduler).await;

        if !self.repository.mark_expired(current.id).await? {
            return Ok(TransitionOutcome::Skipped);
        }

        self.audit(&current, AuditEvent::MarkExpired, AuditActor::Scheduler)
            .await;
        tracing::info!(order_id = %current.order_id, payment_id = %current.id, "Payment marked EXPIRED");
        Ok(TransitionOutcome::Applied)
    }

    /// Record an amount anomaly for manual review.
    pub async fn save_payment_anomaly(&self, anomaly: PaymentAnomaly) -> Result<(), PaymentError> {
        let entry = PaymentAuditLog::new(
            anomaly.order_id,
            AuditEvent::SavePaymentAnomaly,
            AuditActor::Webhook,
        )
        .with_external_id(anomaly.external_id.clone());

        self.repository.save_payment_anomaly(anomaly).await?;
        self.insert_audit(entry).await;
        Ok(())
    }

    /// Store a new PENDING payment request.
    pub async fn save_payment_request(
        &self,
        request: NewPaymentRequest,
    ) -> Result<PaymentRequest, PaymentError> {
        let saved = self.repository.save_payment_request(request).await?;
        self.insert_audit(
            PaymentAuditLog::new(saved.order_id, AuditEvent::SavePaymentRequest, AuditActor::Order)
                .with_user(saved.user_id),
        )
        .await;
        Ok(saved)
    }

    /// Latest payment of an order.
    pub async fn payment_by_order(&self, order_id: OrderId) -> Result<Payment, PaymentError> {
        self.repository
            .find_payment_by_order(order_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound(order_id))
    }

    /// Requests that used up their retries.
    pub async fn exhausted_payment_requests(
        &self,
        max_retry: u32,
    ) -> Result<Vec<PaymentRequest>, PaymentError> {
        Ok(self.repository.find_exhausted_requests(max_retry).await?)
    }

    async fn publish_with_retry(
        &self,
        update: &PaymentStatusUpdate,
    ) -> Result<(), crate::domain::foundation::DomainError> {
        let topic = update.topic();
        retry_with_backoff(&self.retry_policy, "publish_payment_status", || {
            self.publisher.publish_status(update, topic)
        })
        .await
    }

    async fn publish_best_effort(&self, payment: &Payment, actor: AuditActor) {
        let update = PaymentStatusUpdate::failed(payment.order_id);
        if let Err(err) = self.publish_with_retry(&update).await {
            tracing::error!(
                order_id = %payment.order_id,
                error = %err,
                "Publishing FAILED status exhausted retries, continuing"
            );
            self.audit(payment, AuditEvent::PublishPaymentStatusFailed, actor)
                .await;
        }
    }

    /// A conditional update matched no row: someone else settled the payment.
    async fn resolve_lost_race(
        &self,
        order_id: OrderId,
        target: PaymentStatus,
    ) -> Result<TransitionOutcome, PaymentError> {
        let current = self.payment_by_order(order_id).await?;
        if current.status == target {
            return Ok(TransitionOutcome::AlreadyApplied);
        }
        tracing::warn!(
            order_id = %order_id,
            current = %current.status,
            attempted = %target,
            "Payment settled concurrently"
        );
        Err(PaymentError::InvalidTransition {
            order_id,
            current: current.status,
            attempted: target,
        })
    }

    async fn audit(&self, payment: &Payment, event: AuditEvent, actor: AuditActor) {
        let entry = PaymentAuditLog::new(payment.order_id, event, actor)
            .with_user(payment.user_id)
            .with_payment(payment.id)
            .with_external_id(payment.external_id.clone());
        self.insert_audit(entry).await;
    }

    async fn insert_audit(&self, entry: PaymentAuditLog) {
        let order_id = entry.order_id;
        let event = entry.event;
        if let Err(err) = self.repository.insert_audit_log(entry).await {
            tracing::warn!(order_id = %order_id, event = %event, error = %err, "Failed to write audit log");
        }
    }
}

fn ensure_transition(payment: &Payment, target: PaymentStatus) -> Result<(), PaymentError> {
    if payment.status.can_transition_to(&target) {
        Ok(())
    } else {
        Err(PaymentError::InvalidTransition {
            order_id: payment.order_id,
            current: payment.status,
            attempted: target,
        })
    }
}
