//! Redis Streams publisher for payment status updates.
//!
//! Each topic is a stream. Every update becomes one entry with the fields
//! `key` (`order-<id>`), `value` (JSON `{order_id, status}`) and `event_id`
//! (a fresh UUID consumers can deduplicate on).

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::PaymentStatusUpdate;
use crate::ports::PaymentEventPublisher;

/// Approximate cap on stream length.
const DEFAULT_MAX_LEN: usize = 100_000;

/// Publishes status updates with `XADD`.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    conn: MultiplexedConnection,
    max_len: usize,
}

impl RedisStreamPublisher {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            max_len: DEFAULT_MAX_LEN,
        }
    }

    /// Trim streams to roughly `max_len` entries.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

/// Stream entry fields for an update.
pub fn stream_fields(update: &PaymentStatusUpdate) -> Result<Vec<(&'static str, String)>, DomainError> {
    let value = serde_json::to_string(update).map_err(|e| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Failed to encode status update: {}", e),
        )
    })?;

    Ok(vec![
        ("key", update.key()),
        ("value", value),
        ("event_id", Uuid::new_v4().to_string()),
    ])
}

#[async_trait]
impl PaymentEventPublisher for RedisStreamPublisher {
    async fn publish_status(
        &self,
        update: &PaymentStatusUpdate,
        topic: &str,
    ) -> Result<(), DomainError> {
        let fields = stream_fields(update)?;
        let mut conn = self.conn.clone();

        let entry_id: String = conn
            .xadd_maxlen(topic, StreamMaxlen::Approx(self.max_len), "*", fields.as_slice())
            .await
            .map_err(|e: redis::RedisError| {
                DomainError::new(ErrorCode::PublishFailed, e.to_string())
                    .with_detail("topic", topic)
            })?;

        tracing::debug!(
            order_id = %update.order_id,
            topic = topic,
            entry_id = %entry_id,
            "Published payment status update"
        );
        Ok(())
    }
}
