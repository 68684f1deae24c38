//! Durable event queue.
//!
//! Producers publish [`EventEnvelope`]s; the single consumer claims them one
//! at a time in publish order. Every claimed message must be acked (done) or
//! nacked (returned or dropped). Delivery is at-least-once: a consumer that
//! dies mid-event leaves the message to be redelivered.

mod memory;
mod postgres;

pub use memory::MemoryEventQueue;
pub use postgres::PgEventQueue;

use crate::events::EventEnvelope;
use async_trait::async_trait;
use thiserror::Error;

/// Identifies one claimed message until it is acked or nacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryTag(pub i64);

impl std::fmt::Display for DeliveryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub delivery_tag: DeliveryTag,
    pub envelope: EventEnvelope,
    pub enqueued_at: time::OffsetDateTime,
    /// 1 on first delivery.
    pub delivery_count: i32,
}

impl QueueMessage {
    /// Milliseconds spent waiting in the queue before this delivery.
    pub fn queue_wait_ms(&self, now: time::OffsetDateTime) -> i64 {
        let wait = (now - self.enqueued_at).whole_milliseconds();
        i64::try_from(wait).unwrap_or(i64::MAX).max(0)
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("queue backend unavailable")]
    Unavailable,

    #[error("queue is closed")]
    Closed,

    #[error("no message is in flight for delivery tag {0}")]
    UnknownDelivery(DeliveryTag),
}

/// Publishing failed on the first attempt and on the retry.
#[derive(Debug, Error)]
#[error("failed to publish {kind} event: {source}")]
pub struct PublishError {
    pub kind: String,
    #[source]
    pub source: QueueError,
}

#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Append an event to the tail of the queue. A failed write is retried
    /// once before giving up.
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError>;

    /// Claim the oldest deliverable message, if any.
    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError>;

    /// Remove a delivered message permanently.
    async fn ack(&self, tag: DeliveryTag) -> Result<(), QueueError>;

    /// Give a delivered message back. With `requeue` it becomes deliverable
    /// again at its original position, otherwise it is dropped.
    async fn nack(&self, tag: DeliveryTag, requeue: bool) -> Result<(), QueueError>;

    /// Number of messages waiting for delivery. Does not claim anything.
    async fn size(&self) -> Result<u64, QueueError>;

    /// Stop handing out and accepting messages. Safe to call more than once.
    /// Shared resources such as a database pool are left to their owner.
    async fn close(&self);
}
