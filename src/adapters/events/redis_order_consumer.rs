//! Redis Streams consumer for order-created events.
//!
//! Reads the order stream through a consumer group. Every entry carries the
//! event JSON in its `value` field. Entries are acknowledged once handled,
//! including ones that fail to decode or to store, so a poison message never
//! blocks the group.
//!
//! A batch is always handled to the end; shutdown is only observed between
//! batches. On start, and after any read or ack failure, the consumer first
//! re-reads its own pending list (`XREADGROUP ... 0`) and only switches to new
//! entries (`>`) once that list is empty.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `batch_size` | 10 | Max entries per `XREADGROUP` |
//! | `block` | 5s | How long `XREADGROUP` waits for new entries; bounds shutdown latency |
//! | `error_backoff` | 1s | Pause after a failed read |

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tokio::sync::watch;

use crate::application::HandleOrderCreatedHandler;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::OrderCreatedEvent;

/// Stream entry field holding the JSON event.
pub const VALUE_FIELD: &str = "value";

#[derive(Debug, Clone)]
pub struct RedisOrderConsumerConfig {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub batch_size: usize,
    pub block: Duration,
    pub error_backoff: Duration,
}

impl RedisOrderConsumerConfig {
    pub fn new(
        stream: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
            batch_size: 10,
            block: Duration::from_secs(5),
            error_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }
}

/// Consumes order-created events and hands them to the application.
pub struct RedisOrderConsumer {
    conn: MultiplexedConnection,
    handler: Arc<HandleOrderCreatedHandler>,
    config: RedisOrderConsumerConfig,
}

impl RedisOrderConsumer {
    /// `conn` should be dedicated: `XREADGROUP ... BLOCK` holds it while waiting.
    pub fn new(
        conn: MultiplexedConnection,
        handler: Arc<HandleOrderCreatedHandler>,
        config: RedisOrderConsumerConfig,
    ) -> Self {
        Self {
            conn,
            handler,
            config,
        }
    }

    /// Create the consumer group (and stream) if missing.
    pub async fn ensure_group(&self) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&self.config.stream, &self.config.group, "$")
            .await;

        match created {
            Ok(()) => {
                tracing::info!(stream = %self.config.stream, group = %self.config.group, "Consumer group created");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(redis_error("create consumer group", e)),
        }
    }

    /// Consume until shutdown is signalled.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        self.ensure_group().await?;
        tracing::info!(stream = %self.config.stream, consumer = %self.config.consumer, "Order consumer started");

        consume_until_shutdown(shutdown, self.config.error_backoff, |cursor| {
            self.poll_once(cursor)
        })
        .await;

        tracing::info!("Order consumer stopped");
        Ok(())
    }

    /// Read and handle one batch.
    pub async fn poll_once(&self, cursor: ReadCursor) -> Result<PolledBatch, DomainError> {
        let mut options = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer)
            .count(self.config.batch_size);
        if cursor == ReadCursor::New {
            options = options.block(self.config.block.as_millis() as usize);
        }

        let mut conn = self.conn.clone();
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.config.stream], &[cursor.start_id()], &options)
            .await
            .map_err(|e| redis_error("read order stream", e))?;

        let mut batch = PolledBatch::default();
        let Some(reply) = reply else {
            return Ok(batch);
        };

        for key in reply.keys {
            for entry in key.ids {
                batch.delivered += 1;
                self.handle_entry(&entry).await;

                let acked: redis::RedisResult<i64> = conn
                    .xack(&self.config.stream, &self.config.group, &[&entry.id])
                    .await;
                match acked {
                    Ok(_) => batch.acked += 1,
                    Err(err) => tracing::warn!(
                        entry_id = %entry.id,
                        error = %err,
                        "Failed to ack order event, it stays pending"
                    ),
                }
            }
        }

        if cursor == ReadCursor::Pending && batch.delivered > 0 {
            tracing::info!(entries = batch.delivered, "Recovered pending order events");
        }
        Ok(batch)
    }

    async fn handle_entry(&self, entry: &StreamId) {
        let event = match decode_order_event(entry) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(entry_id = %entry.id, error = %err, "Skipping malformed order event");
                return;
            }
        };

        let order_id = event.order_id;
        if let Err(err) = self.handler.handle(event).await {
            tracing::error!(
                entry_id = %entry.id,
                order_id = %order_id,
                error = %err,
                "Failed to record payment request"
            );
        }
    }
}

/// Which entries the next `XREADGROUP` asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCursor {
    /// Delivered to this consumer earlier but never acknowledged.
    Pending,
    /// Never delivered to any consumer of the group.
    New,
}

impl ReadCursor {
    pub fn start_id(self) -> &'static str {
        match self {
            ReadCursor::Pending => "0",
            ReadCursor::New => ">",
        }
    }

    /// Cursor for the read after `batch`.
    pub fn after(self, batch: &PolledBatch) -> ReadCursor {
        if batch.acked < batch.delivered {
            ReadCursor::Pending
        } else if self == ReadCursor::Pending && batch.delivered == 0 {
            ReadCursor::New
        } else {
            self
        }
    }
}

/// Counts for one handled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolledBatch {
    pub delivered: usize,
    pub acked: usize,
}

/// Poll loop shared by the Redis consumer.
///
/// `poll` is always awaited to completion. Only the backoff after a failed
/// poll races the shutdown signal.
async fn consume_until_shutdown<F, Fut>(
    mut shutdown: watch::Receiver<bool>,
    error_backoff: Duration,
    mut poll: F,
) where
    F: FnMut(ReadCursor) -> Fut,
    Fut: Future<Output = Result<PolledBatch, DomainError>>,
{
    let mut cursor = ReadCursor::Pending;

    while !*shutdown.borrow() {
        match poll(cursor).await {
            Ok(batch) => cursor = cursor.after(&batch),
            Err(err) => {
                tracing::warn!(error = %err, "Reading order stream failed");
                cursor = ReadCursor::Pending;
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(error_backoff) => {}
                }
            }
        }
    }
}

/// Decode the event carried by a stream entry.
pub fn decode_order_event(entry: &StreamId) -> Result<OrderCreatedEvent, DomainError> {
    let raw: String = entry.get(VALUE_FIELD).ok_or_else(|| {
        DomainError::new(
            ErrorCode::InvalidFormat,
            format!("Stream entry has no '{}' field", VALUE_FIELD),
        )
    })?;

    serde_json::from_str(&raw).map_err(|e| {
        DomainError::new(ErrorCode::InvalidFormat, format!("Invalid order event: {}", e))
            .with_detail("entry_id", entry.id.clone())
    })
}

fn redis_error(action: &str, err: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::CacheError, format!("Failed to {}: {}", action, err))
}
