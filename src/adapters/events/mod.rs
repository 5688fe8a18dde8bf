//! Event bus adapters.
//!
//! - `RedisStreamPublisher` - publishes payment status updates with `XADD`
//! - `RedisOrderConsumer` - consumes order-created events with `XREADGROUP`
//! - `InMemoryEventBus` - captures updates in tests

mod in_memory;
mod redis_order_consumer;
mod redis_stream;

pub use in_memory::{InMemoryEventBus, PublishedStatus};
pub use redis_order_consumer::{
    decode_order_event, PolledBatch, ReadCursor, RedisOrderConsumer, RedisOrderConsumerConfig,
    VALUE_FIELD,
};
pub use redis_stream::{stream_fields, RedisStreamPublisher};
