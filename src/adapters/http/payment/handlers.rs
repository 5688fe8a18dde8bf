//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to the payment command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::xendit::CALLBACK_TOKEN_HEADER;
use crate::application::{
    DownloadInvoiceHandler, DownloadInvoiceQuery, GetFailedPaymentReportHandler,
    GetFailedPaymentReportQuery, HandleInvoiceWebhookCommand, HandleInvoiceWebhookHandler,
    PaymentLifecycleService,
};
use crate::domain::foundation::OrderId;
use crate::domain::payment::PaymentError;
use crate::ports::{InvoiceDocumentGenerator, InvoiceProvider};

use super::dto::{ErrorResponse, HealthResponse, WebhookResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the payment endpoints.
#[derive(Clone)]
pub struct PaymentAppState {
    pub lifecycle: Arc<PaymentLifecycleService>,
    pub invoice_provider: Arc<dyn InvoiceProvider>,
    pub document_generator: Arc<dyn InvoiceDocumentGenerator>,
    /// Retry threshold of the failed-payment report.
    pub report_max_retry: u32,
}

impl PaymentAppState {
    pub fn webhook_handler(&self) -> HandleInvoiceWebhookHandler {
        HandleInvoiceWebhookHandler::new(self.invoice_provider.clone(), self.lifecycle.clone())
    }

    pub fn failed_report_handler(&self) -> GetFailedPaymentReportHandler {
        GetFailedPaymentReportHandler::new(self.lifecycle.clone())
    }

    pub fn download_invoice_handler(&self) -> DownloadInvoiceHandler {
        DownloadInvoiceHandler::new(self.lifecycle.clone(), self.document_generator.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/invoice - Invoice status callback
pub async fn handle_invoice_webhook(
    State(state): State<PaymentAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    // A missing header is treated like a wrong token.
    let callback_token = headers
        .get(CALLBACK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    // Runs detached so a transport timeout cannot cut a transition short
    // between publish retries and the dead-letter write.
    let handler = state.webhook_handler();
    let cmd = HandleInvoiceWebhookCommand {
        payload: body.to_vec(),
        callback_token,
    };
    let result = tokio::spawn(async move { handler.handle(cmd).await })
        .await
        .map_err(|e| PaymentError::infrastructure(format!("Webhook task aborted: {}", e)))??;

    Ok(Json(WebhookResponse::from(result)))
}

/// GET /payments/failed - Requests that exhausted their retries
pub async fn get_failed_payments(
    State(state): State<PaymentAppState>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let report = state
        .failed_report_handler()
        .handle(GetFailedPaymentReportQuery {
            max_retry: state.report_max_retry,
        })
        .await?;

    Ok(Json(report))
}

/// GET /payments/:order_id/invoice - Download the invoice document
pub async fn download_invoice(
    State(state): State<PaymentAppState>,
    Path(order_id): Path<i64>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let path = state
        .download_invoice_handler()
        .handle(DownloadInvoiceQuery {
            order_id: OrderId::new(order_id),
        })
        .await?;

    let body = tokio::fs::read(&path).await.map_err(|e| {
        PaymentError::infrastructure(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let disposition = format!("attachment; filename=\"invoice_{}.txt\"", order_id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts payment errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentApiError(PaymentError);

impl From<PaymentError> for PaymentApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl PaymentApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            PaymentError::Unauthorized => (StatusCode::FORBIDDEN, "INVALID_CALLBACK_TOKEN"),
            PaymentError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "MALFORMED_PAYLOAD"),
            PaymentError::InvalidExternalId(_) => (StatusCode::BAD_REQUEST, "INVALID_EXTERNAL_ID"),
            PaymentError::PaymentNotFound(_) => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
            PaymentError::AmountMismatch { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "AMOUNT_MISMATCH")
            }
            PaymentError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
            }
            PaymentError::PublishFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PUBLISH_FAILED")
            }
            PaymentError::Infrastructure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "Payment request failed");
            "Internal server error".to_string()
        } else {
            tracing::warn!(error = %self.0, status = status.as_u16(), "Payment request rejected");
            self.0.to_string()
        };

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_status_mapping() {
        let cases = [
            (PaymentError::Unauthorized, StatusCode::FORBIDDEN),
            (PaymentError::MalformedPayload("x".into()), StatusCode::BAD_REQUEST),
            (PaymentError::InvalidExternalId("x".into()), StatusCode::BAD_REQUEST),
            (PaymentError::PaymentNotFound(OrderId::new(1)), StatusCode::NOT_FOUND),
            (
                PaymentError::AmountMismatch {
                    expected: dec!(1),
                    actual: dec!(2),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PaymentError::InvalidTransition {
                    order_id: OrderId::new(1),
                    current: crate::domain::payment::PaymentStatus::Expired,
                    attempted: crate::domain::payment::PaymentStatus::Paid,
                },
                StatusCode::CONFLICT,
            ),
            (PaymentError::infrastructure("db"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(PaymentApiError::from(err).status_and_code().0, expected);
        }
    }

    #[test]
    fn server_errors_hide_details() {
        let response = PaymentApiError::from(PaymentError::infrastructure("password=hunter2"))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
