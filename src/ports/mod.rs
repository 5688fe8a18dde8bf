//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the payment domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence
//!
//! - `PaymentRepository` - payments, payment requests, audit and anomaly records
//!
//! ## External services
//!
//! - `InvoiceProvider` - hosted invoice creation and status lookup
//! - `UserDirectory` - payer contact details
//! - `InvoiceDocumentGenerator` - downloadable invoice files
//!
//! ## Messaging
//!
//! - `PaymentEventPublisher` - payment status updates for downstream services

mod event_publisher;
mod invoice_document;
mod invoice_provider;
mod payment_repository;
mod user_directory;

pub use event_publisher::PaymentEventPublisher;
pub use invoice_document::InvoiceDocumentGenerator;
pub use invoice_provider::{
    CreateInvoiceRequest, Invoice, InvoiceProvider, InvoiceProviderError,
    InvoiceProviderErrorCode, InvoiceStatus, InvoiceWebhook,
};
pub use payment_repository::PaymentRepository;
pub use user_directory::{UserDirectory, UserInfo};
