//! Integration events consumed and produced by the payment service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, UserId};

use super::{ExternalId, PaymentStatus};

/// Topic for PAID status updates.
pub const TOPIC_PAYMENT_SUCCESS: &str = "payment.success";

/// Topic for FAILED status updates (provider failure and expiry).
pub const TOPIC_PAYMENT_FAILED: &str = "payment.failed";

/// Published whenever a payment reaches a terminal state downstream cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusUpdate {
    pub order_id: OrderId,
    pub status: PaymentStatus,
}

impl PaymentStatusUpdate {
    pub fn paid(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: PaymentStatus::Paid,
        }
    }

    pub fn failed(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: PaymentStatus::Failed,
        }
    }

    /// Message key, `order-<id>`.
    pub fn key(&self) -> String {
        ExternalId::for_order(self.order_id).to_string()
    }

    /// Topic the update belongs on.
    pub fn topic(&self) -> &'static str {
        match self.status {
            PaymentStatus::Paid => TOPIC_PAYMENT_SUCCESS,
            _ => TOPIC_PAYMENT_FAILED,
        }
    }
}

/// Emitted by the order service when checkout completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub shipping_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_update_wire_format() {
        let update = PaymentStatusUpdate::paid(OrderId::new(100));
        let json = serde_json::to_value(&update).unwrap();

        assert_eq!(json, serde_json::json!({"order_id": 100, "status": "PAID"}));
        assert_eq!(update.key(), "order-100");
        assert_eq!(update.topic(), TOPIC_PAYMENT_SUCCESS);
    }

    #[test]
    fn failed_update_goes_to_failed_topic() {
        assert_eq!(PaymentStatusUpdate::failed(OrderId::new(1)).topic(), TOPIC_PAYMENT_FAILED);
    }

    #[test]
    fn order_created_parses_numeric_amount() {
        let event: OrderCreatedEvent = serde_json::from_str(
            r#"{"order_id":100,"user_id":5,"total_amount":500.25,"payment_method":"VA","shipping_address":"Jl. Merdeka"}"#,
        )
        .unwrap();

        assert_eq!(event.order_id, OrderId::new(100));
        assert_eq!(event.total_amount, dec!(500.25));
    }
}
