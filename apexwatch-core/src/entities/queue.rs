use crate::events::EventEnvelope;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use serde_json::{Map, Value};
use sqlx::types::Json;
use std::time::Duration;

/// A row of the `event_queue` table as returned by a claim.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueuedEventRow {
    pub id: i64,
    pub kind: String,
    pub payload: Json<Map<String, Value>>,
    pub enqueued_at: time::OffsetDateTime,
    pub delivery_count: i32,
}

impl QueuedEventRow {
    pub fn into_envelope(self) -> EventEnvelope {
        EventEnvelope::new(self.kind, self.payload.0)
    }
}

#[derive(Debug, Clone)]
/// Append an event to the tail of the queue.
pub struct EnqueueEvent {
    pub envelope: EventEnvelope,
}

impl Processor<EnqueueEvent> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:EnqueueEvent")]
    async fn process(&self, cmd: EnqueueEvent) -> Result<i64, sqlx::Error> {
        let EventEnvelope { kind, data } = cmd.envelope;
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO event_queue (kind, payload)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(kind)
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}

#[derive(Debug, Clone)]
/// Claim the oldest deliverable event.
///
/// A row is deliverable when it has never been claimed or when its previous
/// claim is older than `visibility_timeout` (the consumer died mid-event).
/// `SKIP LOCKED` keeps concurrent claimers from handing out the same row.
pub struct ClaimNextEvent {
    pub visibility_timeout: Duration,
}

impl Processor<ClaimNextEvent> for DatabaseProcessor {
    type Output = Option<QueuedEventRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ClaimNextEvent")]
    async fn process(&self, cmd: ClaimNextEvent) -> Result<Option<QueuedEventRow>, sqlx::Error> {
        let row = sqlx::query_as::<_, QueuedEventRow>(
            r#"
            WITH next AS (
                SELECT id
                FROM event_queue
                WHERE claimed_at IS NULL
                   OR claimed_at < NOW() - make_interval(secs => $1)
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE event_queue q
            SET claimed_at = NOW(),
                delivery_count = q.delivery_count + 1
            FROM next
            WHERE q.id = next.id
            RETURNING q.id, q.kind, q.payload, q.enqueued_at, q.delivery_count
            "#,
        )
        .bind(cmd.visibility_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[derive(Debug, Clone)]
/// Permanently remove a delivered event.
pub struct DeleteQueuedEvent {
    pub id: i64,
}

impl Processor<DeleteQueuedEvent> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteQueuedEvent")]
    async fn process(&self, cmd: DeleteQueuedEvent) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM event_queue WHERE id = $1")
            .bind(cmd.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Release a claim so the event is delivered again, keeping its position.
pub struct ReleaseQueuedEvent {
    pub id: i64,
}

impl Processor<ReleaseQueuedEvent> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ReleaseQueuedEvent")]
    async fn process(&self, cmd: ReleaseQueuedEvent) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE event_queue SET claimed_at = NULL WHERE id = $1")
            .bind(cmd.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Count events that are waiting for delivery. Read-only.
pub struct CountDeliverableEvents {
    pub visibility_timeout: Duration,
}

impl Processor<CountDeliverableEvents> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountDeliverableEvents")]
    async fn process(&self, cmd: CountDeliverableEvents) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM event_queue
            WHERE claimed_at IS NULL
               OR claimed_at < NOW() - make_interval(secs => $1)
            "#,
        )
        .bind(cmd.visibility_timeout.as_secs_f64())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
