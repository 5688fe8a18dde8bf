//! Payment and payment-request entities.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    OrderId, PaymentId, PaymentRequestId, StateMachine, Timestamp, UserId,
};

use super::{ExternalId, PaymentRequestStatus, PaymentStatus};

/// An issued invoice for an order.
///
/// At most one non-terminal payment exists per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub external_id: ExternalId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub create_time: Timestamp,
    pub update_time: Timestamp,
    pub expired_time: Timestamp,
}

impl Payment {
    /// Returns true once the payment reached PAID, FAILED or EXPIRED.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if the invoice expiry is at or before `now`.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        !self.expired_time.is_after(now)
    }
}

/// Payment to be inserted after an invoice was created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub external_id: ExternalId,
    pub amount: Decimal,
    pub expired_time: Timestamp,
}

impl NewPayment {
    /// Builds the PENDING payment for an invoice issued from a request.
    pub fn from_request(request: &PaymentRequest, expired_time: Timestamp) -> Self {
        Self {
            order_id: request.order_id,
            user_id: request.user_id,
            external_id: ExternalId::for_order(request.order_id),
            amount: request.amount,
            expired_time,
        }
    }
}

/// Intent to obtain an invoice for an order. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: PaymentRequestId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub status: PaymentRequestStatus,
    pub retry_count: u32,
    pub notes: Option<String>,
    pub create_time: Timestamp,
    pub update_time: Timestamp,
}

impl PaymentRequest {
    /// Returns true if the recoverer may still requeue this request.
    pub fn is_retryable(&self, max_retry: u32) -> bool {
        self.status == PaymentRequestStatus::Failed && self.retry_count <= max_retry
    }

    /// Returns true if the request gave up and belongs to the failed report.
    pub fn is_exhausted(&self, max_retry: u32) -> bool {
        self.status == PaymentRequestStatus::Failed && self.retry_count > max_retry
    }
}

/// Payment request to be inserted from an order-created event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(status: PaymentRequestStatus, retry_count: u32) -> PaymentRequest {
        PaymentRequest {
            id: PaymentRequestId::new(1),
            order_id: OrderId::new(100),
            user_id: UserId::new(5),
            amount: dec!(500),
            status,
            retry_count,
            notes: None,
            create_time: Timestamp::now(),
            update_time: Timestamp::now(),
        }
    }

    #[test]
    fn new_payment_uses_order_external_id() {
        let expiry = Timestamp::now().plus_hours(24);
        let payment = NewPayment::from_request(&request(PaymentRequestStatus::Pending, 0), expiry);

        assert_eq!(payment.external_id.to_string(), "order-100");
        assert_eq!(payment.amount, dec!(500));
        assert_eq!(payment.expired_time, expiry);
    }

    #[test]
    fn retry_threshold_is_inclusive() {
        assert!(request(PaymentRequestStatus::Failed, 3).is_retryable(3));
        assert!(!request(PaymentRequestStatus::Failed, 4).is_retryable(3));
        assert!(request(PaymentRequestStatus::Failed, 4).is_exhausted(3));
        assert!(!request(PaymentRequestStatus::Pending, 9).is_exhausted(3));
    }

    #[test]
    fn payment_expiry_check() {
        let now = Timestamp::now();
        let payment = Payment {
            id: PaymentId::new(1),
            order_id: OrderId::new(100),
            user_id: UserId::new(5),
            external_id: ExternalId::for_order(OrderId::new(100)),
            amount: dec!(500),
            status: PaymentStatus::Pending,
            create_time: now,
            update_time: now,
            expired_time: now.minus_hours(1),
        };

        assert!(payment.is_expired_at(&now));
        assert!(!payment.is_terminal());
    }
}
