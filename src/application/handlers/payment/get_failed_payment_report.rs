//! GetFailedPaymentReportHandler - lists requests that ran out of retries.

use std::sync::Arc;

use crate::application::lifecycle::PaymentLifecycleService;
use crate::domain::payment::{FailedPaymentReport, PaymentError};

/// Retry threshold used when none is given.
pub const DEFAULT_REPORT_MAX_RETRY: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetFailedPaymentReportQuery {
    /// Requests with more retries than this are reported.
    pub max_retry: u32,
}

impl Default for GetFailedPaymentReportQuery {
    fn default() -> Self {
        Self {
            max_retry: DEFAULT_REPORT_MAX_RETRY,
        }
    }
}

pub struct GetFailedPaymentReportHandler {
    lifecycle: Arc<PaymentLifecycleService>,
}

impl GetFailedPaymentReportHandler {
    pub fn new(lifecycle: Arc<PaymentLifecycleService>) -> Self {
        Self { lifecycle }
    }

    pub async fn handle(
        &self,
        query: GetFailedPaymentReportQuery,
    ) -> Result<FailedPaymentReport, PaymentError> {
        let requests = self
            .lifecycle
            .exhausted_payment_requests(query.max_retry)
            .await?;
        Ok(FailedPaymentReport::new(requests))
    }
}
