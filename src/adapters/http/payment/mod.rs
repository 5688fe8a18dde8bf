//! Payment HTTP adapter.
//!
//! Exposes the invoice webhook, the failed-payment report and invoice
//! downloads.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookResponse};
pub use handlers::{PaymentApiError, PaymentAppState};
pub use routes::{payment_router, payment_routes};
