use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// Telemetry for one processed event, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProcessingMetric {
    pub id: Uuid,
    pub event_kind: String,
    pub latency_ms: i64,
    /// Time between publish and delivery.
    pub queue_wait_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct InsertProcessingMetric {
    pub metric: ProcessingMetric,
}

impl Processor<InsertProcessingMetric> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertProcessingMetric")]
    async fn process(&self, cmd: InsertProcessingMetric) -> Result<(), sqlx::Error> {
        let m = cmd.metric;
        sqlx::query(
            r#"
            INSERT INTO event_metrics
                (id, event_kind, latency_ms, queue_wait_ms, success, error_message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(m.id)
        .bind(m.event_kind)
        .bind(m.latency_ms)
        .bind(m.queue_wait_ms)
        .bind(m.success)
        .bind(m.error_message)
        .bind(m.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
