//! Local filesystem invoice document generator.
//!
//! Renders a payment as a plain-text invoice under a base directory.
//! Uses a write-to-temp-then-rename pattern so readers never see a
//! partially written file.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::domain::payment::Payment;
use crate::ports::InvoiceDocumentGenerator;

/// Writes `invoice_<order_id>.txt` files.
///
/// # Usage
///
/// ```rust,ignore
/// let generator = LocalInvoiceDocumentGenerator::new("/var/invoices");
/// let path = generator.generate(&payment).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LocalInvoiceDocumentGenerator {
    base_path: PathBuf,
}

impl LocalInvoiceDocumentGenerator {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Path the invoice for `order_id` is written to.
    pub fn invoice_path(&self, order_id: OrderId) -> PathBuf {
        self.base_path.join(format!("invoice_{}.txt", order_id))
    }

    fn temp_path(&self, order_id: OrderId) -> PathBuf {
        self.base_path.join(format!("invoice_{}.txt.tmp", order_id))
    }
}

fn io_error(action: &str, path: &std::path::Path, err: std::io::Error) -> DomainError {
    DomainError::new(
        ErrorCode::InternalError,
        format!("Failed to {} {}: {}", action, path.display(), err),
    )
}

/// Plain-text invoice body.
pub fn render_invoice(payment: &Payment) -> String {
    let mut out = String::new();
    out.push_str("INVOICE\n");
    out.push_str("=======\n\n");
    out.push_str(&format!("Invoice No : {}\n", payment.external_id));
    out.push_str(&format!("Order ID   : {}\n", payment.order_id));
    out.push_str(&format!("User ID    : {}\n", payment.user_id));
    out.push_str(&format!("Status     : {}\n", payment.status));
    out.push_str(&format!(
        "Issued     : {}\n",
        payment.create_time.as_datetime().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Due        : {}\n\n",
        payment.expired_time.as_datetime().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Total      : {:.2}\n", payment.amount));
    out
}

#[async_trait]
impl InvoiceDocumentGenerator for LocalInvoiceDocumentGenerator {
    async fn generate(&self, payment: &Payment) -> Result<PathBuf, DomainError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| io_error("create directory", &self.base_path, e))?;

        let temp_path = self.temp_path(payment.order_id);
        let final_path = self.invoice_path(payment.order_id);

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| io_error("create temp file", &temp_path, e))?;
        file.write_all(render_invoice(payment).as_bytes())
            .await
            .map_err(|e| io_error("write temp file", &temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("sync temp file", &temp_path, e))?;

        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| io_error("rename temp file to", &final_path, e))?;

        tracing::debug!(order_id = %payment.order_id, path = %final_path.display(), "Invoice document written");
        Ok(final_path)
    }
}
