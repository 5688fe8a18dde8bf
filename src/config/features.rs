//! Feature flags and document output configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeatureFlags {
    /// Issue the invoice while handling the order-created event instead of
    /// waiting for the pending-request scheduler
    #[serde(default)]
    pub create_invoice_directly: bool,

    /// Consume order-created events from Redis in this process
    #[serde(default = "default_true")]
    pub consume_order_events: bool,
}

/// Where rendered invoice documents are written
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./invoices")
}
