//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `PAYMENT_RECONCILER`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use payment_reconciler::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod features;
mod invoice;
mod redis;
mod scheduler;
mod server;
mod user_service;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use features::{DocumentConfig, FeatureFlags};
pub use invoice::InvoiceConfig;
pub use redis::RedisConfig;
pub use scheduler::{RetrySettings, SchedulerSettings};
pub use server::{Environment, ServerConfig};
pub use user_service::UserServiceConfig;

use serde::Deserialize;

use crate::adapters::events::RedisOrderConsumerConfig;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Redis streams (order events in, status updates out)
    pub redis: RedisConfig,

    /// Invoice provider (Xendit)
    pub invoice: InvoiceConfig,

    pub user_service: UserServiceConfig,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Status publish retries
    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub features: FeatureFlags,

    #[serde(default)]
    pub documents: DocumentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `PAYMENT_RECONCILER__*` variables:
    ///
    /// - `PAYMENT_RECONCILER__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYMENT_RECONCILER__INVOICE__API_KEY=...` -> `invoice.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYMENT_RECONCILER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.invoice.validate(self.is_production())?;
        self.user_service.validate()?;
        self.scheduler.validate()?;
        self.retry.validate()?;

        let retry_budget = self.retry.retry_policy().total_delay();
        if self.server.request_timeout() <= retry_budget {
            return Err(ValidationError::TimeoutWithinRetryBudget {
                retry_budget_secs: retry_budget.as_secs(),
            });
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Consumer settings for the order-created stream.
    pub fn order_consumer_config(&self) -> RedisOrderConsumerConfig {
        RedisOrderConsumerConfig::new(
            self.redis.order_created_stream.clone(),
            self.redis.consumer_group.clone(),
            self.redis.consumer_name.clone(),
        )
        .with_batch_size(self.redis.read_batch)
    }

    /// Failed requests retried more often than this are no longer requeued
    /// and show up in the failed-payment report.
    pub fn report_max_retry(&self) -> u32 {
        self.scheduler.max_request_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(
            "PAYMENT_RECONCILER__DATABASE__URL",
            "postgresql://test@localhost/payments",
        );
        env::set_var("PAYMENT_RECONCILER__REDIS__URL", "redis://localhost:6379");
        env::set_var("PAYMENT_RECONCILER__INVOICE__API_KEY", "xnd_development_xxx");
        env::set_var("PAYMENT_RECONCILER__INVOICE__CALLBACK_TOKEN", "cb-token");
        env::set_var(
            "PAYMENT_RECONCILER__USER_SERVICE__BASE_URL",
            "http://users.internal:8081",
        );
    }

    fn clear_env() {
        for key in [
            "PAYMENT_RECONCILER__DATABASE__URL",
            "PAYMENT_RECONCILER__REDIS__URL",
            "PAYMENT_RECONCILER__INVOICE__API_KEY",
            "PAYMENT_RECONCILER__INVOICE__CALLBACK_TOKEN",
            "PAYMENT_RECONCILER__USER_SERVICE__BASE_URL",
            "PAYMENT_RECONCILER__SERVER__PORT",
            "PAYMENT_RECONCILER__SERVER__ENVIRONMENT",
            "PAYMENT_RECONCILER__FEATURES__CREATE_INVOICE_DIRECTLY",
            "PAYMENT_RECONCILER__SERVER__REQUEST_TIMEOUT_SECS",
            "PAYMENT_RECONCILER__RETRY__BASE_DELAY_MS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/payments");
        assert_eq!(config.invoice.callback_token.expose_secret(), "cb-token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_applied() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.redis.order_created_stream, "order.created");
        assert_eq!(config.scheduler.pending_requests_batch, 5);
        assert_eq!(config.retry.max_attempts, 5);
        assert!(!config.features.create_invoice_directly);
        assert_eq!(config.report_max_retry(), 3);
    }

    #[test]
    fn test_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYMENT_RECONCILER__SERVER__PORT", "3000");
        env::set_var("PAYMENT_RECONCILER__SERVER__ENVIRONMENT", "production");
        env::set_var("PAYMENT_RECONCILER__FEATURES__CREATE_INVOICE_DIRECTLY", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert!(config.features.create_invoice_directly);
    }

    #[test]
    fn test_missing_invoice_section_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("PAYMENT_RECONCILER__INVOICE__API_KEY");
        env::remove_var("PAYMENT_RECONCILER__INVOICE__CALLBACK_TOKEN");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_request_timeout_must_outlast_publish_retries() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYMENT_RECONCILER__SERVER__REQUEST_TIMEOUT_SECS", "30");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::TimeoutWithinRetryBudget {
                retry_budget_secs: 31
            })
        );
    }

    #[test]
    fn test_shorter_backoff_fits_short_timeout() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYMENT_RECONCILER__SERVER__REQUEST_TIMEOUT_SECS", "30");
        env::set_var("PAYMENT_RECONCILER__RETRY__BASE_DELAY_MS", "500");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_order_consumer_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let consumer = result.unwrap().order_consumer_config();
        assert_eq!(consumer.stream, "order.created");
        assert_eq!(consumer.group, "payment-reconciler");
        assert_eq!(consumer.batch_size, 10);
    }
}
