//! Document adapters - invoice document generation.
//!
//! - `LocalInvoiceDocumentGenerator` - writes plain-text invoices to a local directory

mod local_invoice_generator;

pub use local_invoice_generator::{render_invoice, LocalInvoiceDocumentGenerator};
