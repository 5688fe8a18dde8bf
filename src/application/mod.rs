//! Application layer - services, handlers and schedulers.
//!
//! `PaymentLifecycleService` owns every terminal payment transition.
//! `InvoiceIssuer` turns pending requests into invoices. Handlers serve the
//! inbound adapters and the schedulers poll storage and the provider.

pub mod handlers;
pub mod invoicing;
pub mod lifecycle;
pub mod retry;
pub mod schedulers;

pub use handlers::{
    DownloadInvoiceHandler, DownloadInvoiceQuery, GetFailedPaymentReportHandler,
    GetFailedPaymentReportQuery, HandleInvoiceWebhookCommand, HandleInvoiceWebhookHandler,
    HandleInvoiceWebhookResult, HandleOrderCreatedHandler, HandleOrderCreatedResult,
};
pub use invoicing::{InvoiceIssuer, IssueOutcome, DEFAULT_DESCRIPTION_PREFIX};
pub use lifecycle::{PaymentLifecycleService, TransitionOutcome};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use schedulers::{
    ExpirySweeper, FailedRequestRecoverer, PendingInvoiceChecker, PendingRequestProcessor,
    Schedule, ScheduledJob, SchedulerConfig, SchedulerSupervisor,
};
