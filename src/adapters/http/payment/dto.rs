//! Request and response bodies for the payment endpoints.

use serde::{Deserialize, Serialize};

use crate::application::HandleInvoiceWebhookResult;
use crate::application::TransitionOutcome;

/// Body returned for an accepted webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub order_id: i64,
    /// `paid`, `failed` or `acknowledged`.
    pub result: String,
    /// False when the payment was already in the requested state.
    pub changed: bool,
}

impl From<HandleInvoiceWebhookResult> for WebhookResponse {
    fn from(result: HandleInvoiceWebhookResult) -> Self {
        match result {
            HandleInvoiceWebhookResult::Paid { order_id, outcome } => Self {
                order_id: order_id.as_i64(),
                result: "paid".to_string(),
                changed: outcome == TransitionOutcome::Applied,
            },
            HandleInvoiceWebhookResult::Failed { order_id, outcome } => Self {
                order_id: order_id.as_i64(),
                result: "failed".to_string(),
                changed: outcome == TransitionOutcome::Applied,
            },
            HandleInvoiceWebhookResult::Acknowledged { order_id, .. } => Self {
                order_id: order_id.as_i64(),
                result: "acknowledged".to_string(),
                changed: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Standard error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::OrderId;

    #[test]
    fn repeated_paid_webhook_reports_unchanged() {
        let response = WebhookResponse::from(HandleInvoiceWebhookResult::Paid {
            order_id: OrderId::new(100),
            outcome: TransitionOutcome::AlreadyApplied,
        });

        assert_eq!(response.result, "paid");
        assert!(!response.changed);
    }

    #[test]
    fn error_response_serializes_code_and_message() {
        let json = serde_json::to_value(ErrorResponse::new("PAYMENT_NOT_FOUND", "missing")).unwrap();
        assert_eq!(json["error_code"], "PAYMENT_NOT_FOUND");
        assert_eq!(json["message"], "missing");
    }
}
