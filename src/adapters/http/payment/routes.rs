//! Axum router configuration for payment endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    download_invoice, get_failed_payments, handle_invoice_webhook, health, PaymentAppState,
};

/// Create the payment API router.
///
/// # Routes
/// - `POST /webhooks/invoice` - Invoice status callback (callback token verified)
/// - `GET /payments/failed` - Failed-payment report
/// - `GET /payments/:order_id/invoice` - Invoice document download
/// - `GET /health` - Liveness probe
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/webhooks/invoice", post(handle_invoice_webhook))
        .route("/payments/failed", get(get_failed_payments))
        .route("/payments/:order_id/invoice", get(download_invoice))
        .route("/health", get(health))
}

/// Complete application router with tracing and a request timeout.
pub fn payment_router(state: PaymentAppState, request_timeout: Duration) -> Router {
    payment_routes()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
