//! PaymentEventPublisher port - Interface for announcing payment outcomes.
//!
//! The domain publishes status updates without knowing the underlying
//! transport (in-memory bus, Redis streams, etc.).

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payment::PaymentStatusUpdate;

/// Port for publishing payment status updates to downstream consumers.
///
/// Implementations must ensure:
/// - The message key is the update's external id (`order-<id>`)
/// - The value is the JSON `{order_id, status}`
/// - Errors are propagated so callers can retry
#[async_trait]
pub trait PaymentEventPublisher: Send + Sync {
    /// Publish one status update on `topic`.
    async fn publish_status(
        &self,
        update: &PaymentStatusUpdate,
        topic: &str,
    ) -> Result<(), DomainError>;
}
