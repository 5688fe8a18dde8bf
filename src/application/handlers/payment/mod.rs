//! Payment handlers.
//!
//! ## Commands
//! - Applying invoice webhooks from the provider
//! - Recording order-created events as payment requests
//!
//! ## Queries
//! - Failed-payment report
//! - Invoice document download

mod download_invoice;
mod get_failed_payment_report;
mod handle_invoice_webhook;
mod handle_order_created;

// Commands
pub use handle_invoice_webhook::{
    HandleInvoiceWebhookCommand, HandleInvoiceWebhookHandler, HandleInvoiceWebhookResult,
};
pub use handle_order_created::{HandleOrderCreatedHandler, HandleOrderCreatedResult};

// Queries
pub use download_invoice::{DownloadInvoiceHandler, DownloadInvoiceQuery};
pub use get_failed_payment_report::{
    GetFailedPaymentReportHandler, GetFailedPaymentReportQuery, DEFAULT_REPORT_MAX_RETRY,
};
