//! Redis configuration
//!
//! Redis streams carry order-created events in and payment status updates out.

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Stream the order service writes order-created events to
    #[serde(default = "default_order_created_stream")]
    pub order_created_stream: String,

    /// Consumer group reading the order stream
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// This instance's consumer name within the group
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Max entries read per `XREADGROUP`
    #[serde(default = "default_read_batch")]
    pub read_batch: usize,

    /// Approximate cap on published stream length
    #[serde(default = "default_stream_max_len")]
    pub stream_max_len: usize,
}

impl RedisConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS__URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.order_created_stream.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS__ORDER_CREATED_STREAM"));
        }
        if self.read_batch == 0 {
            return Err(ValidationError::MustBePositive("redis.read_batch"));
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            order_created_stream: default_order_created_stream(),
            consumer_group: default_consumer_group(),
            consumer_name: default_consumer_name(),
            read_batch: default_read_batch(),
            stream_max_len: default_stream_max_len(),
        }
    }
}

fn default_order_created_stream() -> String {
    "order.created".to_string()
}

fn default_consumer_group() -> String {
    "payment-reconciler".to_string()
}

fn default_consumer_name() -> String {
    "payment-reconciler-1".to_string()
}

fn default_read_batch() -> usize {
    10
}

fn default_stream_max_len() -> usize {
    100_000
}
