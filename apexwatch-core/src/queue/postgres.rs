use super::{DeliveryTag, EventQueue, PublishError, QueueError, QueueMessage};
use crate::config::QueueConfig;
use crate::entities::queue::{
    ClaimNextEvent, CountDeliverableEvents, DeleteQueuedEvent, EnqueueEvent, QueuedEventRow,
    ReleaseQueuedEvent,
};
use crate::events::EventEnvelope;
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Queue backed by the `event_queue` table.
///
/// Messages survive restarts. A claim that is neither acked nor nacked within
/// the visibility timeout is handed out again.
pub struct PgEventQueue {
    db: DatabaseProcessor,
    config: QueueConfig,
    closed: AtomicBool,
}

impl PgEventQueue {
    pub fn new(db: DatabaseProcessor, config: QueueConfig) -> Self {
        Self {
            db,
            config,
            closed: AtomicBool::new(false),
        }
    }

    async fn enqueue(&self, envelope: EventEnvelope) -> Result<i64, QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        Ok(self.db.process(EnqueueEvent { envelope }).await?)
    }
}

impl From<QueuedEventRow> for QueueMessage {
    fn from(row: QueuedEventRow) -> Self {
        Self {
            delivery_tag: DeliveryTag(row.id),
            enqueued_at: row.enqueued_at,
            delivery_count: row.delivery_count,
            envelope: row.into_envelope(),
        }
    }
}

#[async_trait]
impl EventQueue for PgEventQueue {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError> {
        let kind = envelope.kind.clone();
        let id = match self.enqueue(envelope.clone()).await {
            Ok(id) => id,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Failed to publish event, retrying once");
                self.enqueue(envelope)
                    .await
                    .map_err(|source| PublishError { kind: kind.clone(), source })?
            }
        };
        debug!(id, kind = %kind, "Event published");
        Ok(())
    }

    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let row = self
            .db
            .process(ClaimNextEvent {
                visibility_timeout: self.config.visibility_timeout,
            })
            .await?;
        Ok(row.map(QueueMessage::from))
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), QueueError> {
        let affected = self.db.process(DeleteQueuedEvent { id: tag.0 }).await?;
        if affected == 0 {
            return Err(QueueError::UnknownDelivery(tag));
        }
        Ok(())
    }

    async fn nack(&self, tag: DeliveryTag, requeue: bool) -> Result<(), QueueError> {
        let affected = if requeue {
            self.db.process(ReleaseQueuedEvent { id: tag.0 }).await?
        } else {
            self.db.process(DeleteQueuedEvent { id: tag.0 }).await?
        };
        if affected == 0 {
            return Err(QueueError::UnknownDelivery(tag));
        }
        Ok(())
    }

    async fn size(&self) -> Result<u64, QueueError> {
        let count = self
            .db
            .process(CountDeliverableEvents {
                visibility_timeout: self.config.visibility_timeout,
            })
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Stop accepting publishes and claims. The pool is shared with the
    /// other stores and stays open; its owner closes it.
    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Event queue closed");
        }
    }
}
