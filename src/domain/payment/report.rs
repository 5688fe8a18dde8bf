//! Failed-payment report read model.

use serde::Serialize;

use super::PaymentRequest;

/// Requests that exhausted their retries and need manual follow-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedPaymentReport {
    pub total_failed_payments: usize,
    pub payment_list: Vec<PaymentRequest>,
}

impl FailedPaymentReport {
    pub fn new(payment_list: Vec<PaymentRequest>) -> Self {
        Self {
            total_failed_payments: payment_list.len(),
            payment_list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_counts_zero() {
        let report = FailedPaymentReport::new(Vec::new());
        assert_eq!(report.total_failed_payments, 0);
        assert_eq!(
            serde_json::to_value(&report).unwrap()["total_failed_payments"],
            serde_json::json!(0)
        );
    }
}
