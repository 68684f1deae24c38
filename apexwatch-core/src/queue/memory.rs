use super::{DeliveryTag, EventQueue, PublishError, QueueError, QueueMessage};
use crate::events::EventEnvelope;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone)]
struct Stored {
    envelope: EventEnvelope,
    enqueued_at: time::OffsetDateTime,
    delivery_count: i32,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    /// Deliverable messages keyed by publish order.
    ready: BTreeMap<i64, Stored>,
    in_flight: HashMap<i64, Stored>,
    closed: bool,
    /// Number of upcoming publish attempts that fail.
    failing_publishes: usize,
}

/// In-process queue with the same ordering and ack discipline as the
/// database queue. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryEventQueue {
    state: Mutex<State>,
}

impl MemoryEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` publish attempts fail.
    pub async fn fail_next_publishes(&self, n: usize) {
        self.state.lock().await.failing_publishes = n;
    }

    /// Messages claimed but not yet acked or nacked.
    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    async fn try_publish(&self, envelope: &EventEnvelope) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }
        if state.failing_publishes > 0 {
            state.failing_publishes -= 1;
            return Err(QueueError::Unavailable);
        }
        state.next_id += 1;
        let id = state.next_id;
        state.ready.insert(
            id,
            Stored {
                envelope: envelope.clone(),
                enqueued_at: time::OffsetDateTime::now_utc(),
                delivery_count: 0,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl EventQueue for MemoryEventQueue {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError> {
        if let Err(e) = self.try_publish(&envelope).await {
            warn!(kind = %envelope.kind, error = %e, "Failed to publish event, retrying once");
        } else {
            return Ok(());
        }
        self.try_publish(&envelope)
            .await
            .map_err(|source| PublishError {
                kind: envelope.kind.clone(),
                source,
            })
    }

    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }
        let Some((id, mut stored)) = state.ready.pop_first() else {
            return Ok(None);
        };
        stored.delivery_count += 1;
        let message = QueueMessage {
            delivery_tag: DeliveryTag(id),
            envelope: stored.envelope.clone(),
            enqueued_at: stored.enqueued_at,
            delivery_count: stored.delivery_count,
        };
        state.in_flight.insert(id, stored);
        Ok(Some(message))
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state
            .in_flight
            .remove(&tag.0)
            .map(|_| ())
            .ok_or(QueueError::UnknownDelivery(tag))
    }

    async fn nack(&self, tag: DeliveryTag, requeue: bool) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let stored = state
            .in_flight
            .remove(&tag.0)
            .ok_or(QueueError::UnknownDelivery(tag))?;
        if requeue {
            state.ready.insert(tag.0, stored);
        }
        Ok(())
    }

    async fn size(&self) -> Result<u64, QueueError> {
        let state = self.state.lock().await;
        Ok(state.ready.len() as u64)
    }

    async fn close(&self) {
        self.state.lock().await.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn envelope(kind: &str, token: &str) -> EventEnvelope {
        let mut data = Map::new();
        data.insert("token_id".to_string(), json!(token));
        EventEnvelope::new(kind, data)
    }

    #[tokio::test]
    async fn test_fifo_delivery() {
        let queue = MemoryEventQueue::new();
        queue.publish(envelope("price_change", "a")).await.unwrap();
        queue.publish(envelope("news_update", "b")).await.unwrap();
        assert_eq!(queue.size().await.unwrap(), 2);

        let first = queue.receive().await.unwrap().unwrap();
        assert_eq!(first.envelope.kind, "price_change");
        assert_eq!(first.delivery_count, 1);
        queue.ack(first.delivery_tag).await.unwrap();

        let second = queue.receive().await.unwrap().unwrap();
        assert_eq!(second.envelope.kind, "news_update");
        queue.ack(second.delivery_tag).await.unwrap();

        assert!(queue.receive().await.unwrap().is_none());
        assert_eq!(queue.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_requeued_message_keeps_its_position() {
        let queue = MemoryEventQueue::new();
        queue.publish(envelope("price_change", "a")).await.unwrap();
        queue.publish(envelope("volume_spike", "a")).await.unwrap();

        let first = queue.receive().await.unwrap().unwrap();
        queue.nack(first.delivery_tag, true).await.unwrap();

        let again = queue.receive().await.unwrap().unwrap();
        assert_eq!(again.delivery_tag, first.delivery_tag);
        assert_eq!(again.envelope.kind, "price_change");
        assert_eq!(again.delivery_count, 2);
    }

    #[tokio::test]
    async fn test_nack_without_requeue_drops() {
        let queue = MemoryEventQueue::new();
        queue.publish(envelope("price_change", "a")).await.unwrap();

        let message = queue.receive().await.unwrap().unwrap();
        queue.nack(message.delivery_tag, false).await.unwrap();

        assert!(queue.receive().await.unwrap().is_none());
        assert_eq!(queue.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_size_ignores_in_flight() {
        let queue = MemoryEventQueue::new();
        queue.publish(envelope("price_change", "a")).await.unwrap();
        queue.publish(envelope("price_change", "b")).await.unwrap();

        let _claimed = queue.receive().await.unwrap().unwrap();
        assert_eq!(queue.size().await.unwrap(), 1);
        assert_eq!(queue.in_flight().await, 1);
    }

    #[tokio::test]
    async fn test_ack_unknown_tag() {
        let queue = MemoryEventQueue::new();
        let err = queue.ack(DeliveryTag(42)).await.unwrap_err();
        assert!(matches!(err, QueueError::UnknownDelivery(DeliveryTag(42))));
    }

    #[tokio::test]
    async fn test_publish_retries_once() {
        let queue = MemoryEventQueue::new();

        queue.fail_next_publishes(1).await;
        queue.publish(envelope("price_change", "a")).await.unwrap();
        assert_eq!(queue.size().await.unwrap(), 1);

        queue.fail_next_publishes(2).await;
        let err = queue.publish(envelope("news_update", "a")).await.unwrap_err();
        assert_eq!(err.kind, "news_update");
        assert_eq!(queue.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let queue = MemoryEventQueue::new();
        queue.close().await;
        queue.close().await;
        assert!(matches!(queue.receive().await, Err(QueueError::Closed)));
        assert!(queue.publish(envelope("price_change", "a")).await.is_err());
    }
}
