//! Invoice provider configuration (Xendit)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::xendit::{XenditConfig, DEFAULT_BASE_URL};
use crate::application::DEFAULT_DESCRIPTION_PREFIX;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceConfig {
    /// Xendit secret API key
    pub api_key: SecretString,

    /// Token Xendit sends in `x-callback-token`
    pub callback_token: SecretString,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Prepended to the order id in invoice descriptions
    #[serde(default = "default_description_prefix")]
    pub description_prefix: String,
}

impl InvoiceConfig {
    pub fn is_test_mode(&self) -> bool {
        self.api_key.expose_secret().starts_with("xnd_development_")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Adapter configuration with the secrets wrapped.
    pub fn xendit_config(&self) -> XenditConfig {
        XenditConfig::new(self.api_key.clone(), self.callback_token.clone())
        .with_base_url(self.base_url.clone())
        .with_timeout(self.timeout())
    }

    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        let api_key = self.api_key.expose_secret();
        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("INVOICE__API_KEY"));
        }
        if self.callback_token.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("INVOICE__CALLBACK_TOKEN"));
        }
        if !api_key.starts_with("xnd_") {
            return Err(ValidationError::InvalidXenditKey);
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("invoice.base_url"));
        }
        if production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::ProviderUrlMustBeHttps);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_description_prefix() -> String {
    DEFAULT_DESCRIPTION_PREFIX.to_string()
}
