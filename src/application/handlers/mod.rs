//! Application handlers.
//!
//! Command and query handlers invoked by the inbound adapters.

pub mod payment;

pub use payment::{
    DownloadInvoiceHandler, DownloadInvoiceQuery, GetFailedPaymentReportHandler,
    GetFailedPaymentReportQuery, HandleInvoiceWebhookCommand, HandleInvoiceWebhookHandler,
    HandleInvoiceWebhookResult, HandleOrderCreatedHandler, HandleOrderCreatedResult,
    DEFAULT_REPORT_MAX_RETRY,
};
