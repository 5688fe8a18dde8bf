//! InvoiceDocumentGenerator port - renders a payment into a downloadable file.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payment::Payment;

/// Port for producing invoice documents.
#[async_trait]
pub trait InvoiceDocumentGenerator: Send + Sync {
    /// Render the invoice for `payment` and return the written file's path.
    async fn generate(&self, payment: &Payment) -> Result<PathBuf, DomainError>;
}
