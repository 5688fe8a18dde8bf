//! Payment-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Unauthorized | 403 |
//! | MalformedPayload / InvalidExternalId | 400 |
//! | PaymentNotFound | 404 |
//! | InvalidTransition | 409 |
//! | AmountMismatch | 422 |
//! | PublishFailed / Infrastructure | 500 |

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, ValidationError};

use super::PaymentStatus;

/// Errors surfaced by the lifecycle service and inbound handlers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    /// No payment row exists for the order.
    #[error("Payment not found for order {0}")]
    PaymentNotFound(OrderId),

    /// The payment is in a state that forbids the requested transition.
    #[error("Cannot move payment of order {order_id} from {current} to {attempted}")]
    InvalidTransition {
        order_id: OrderId,
        current: PaymentStatus,
        attempted: PaymentStatus,
    },

    /// Webhook amount differs from the stored amount; an anomaly was recorded.
    #[error("Webhook amount mismatch: expected {expected:.2}, got {actual:.2}")]
    AmountMismatch { expected: Decimal, actual: Decimal },

    /// Status event could not be delivered after all retries.
    #[error("Failed to publish status event for order {order_id}: {reason}")]
    PublishFailed { order_id: OrderId, reason: String },

    /// External id in the webhook is not of the form `order-<id>`.
    #[error("Invalid external id: {0}")]
    InvalidExternalId(String),

    /// Webhook callback token did not match.
    #[error("Invalid webhook token")]
    Unauthorized,

    /// Webhook body could not be parsed.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Storage or integration failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl PaymentError {
    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::PaymentNotFound(_) => ErrorCode::PaymentNotFound,
            PaymentError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            PaymentError::AmountMismatch { .. } => ErrorCode::ValidationFailed,
            PaymentError::PublishFailed { .. } => ErrorCode::PublishFailed,
            PaymentError::InvalidExternalId(_) | PaymentError::MalformedPayload(_) => {
                ErrorCode::InvalidFormat
            }
            PaymentError::Unauthorized => ErrorCode::ValidationFailed,
            PaymentError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns true if the provider should redeliver the webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::Infrastructure(_) | PaymentError::PublishFailed { .. }
        )
    }
}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => {
                PaymentError::MalformedPayload(err.message)
            }
            _ => PaymentError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for PaymentError {
    fn from(err: ValidationError) -> Self {
        PaymentError::InvalidExternalId(err.to_string())
    }
}
