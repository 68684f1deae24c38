use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::types::Json;

/// Audit trail of processed events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogEntry {
    pub token_id: String,
    pub event_kind: String,
    pub event_data: Map<String, Value>,
    pub processed_at: time::OffsetDateTime,
}

/// A numeric data point derived from an event (e.g. `price`).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TokenAnalytic {
    pub token_id: String,
    pub metric_name: String,
    pub metric_value: Decimal,
    pub created_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct InsertEventLog {
    pub entry: EventLogEntry,
}

impl Processor<InsertEventLog> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertEventLog")]
    async fn process(&self, cmd: InsertEventLog) -> Result<(), sqlx::Error> {
        let e = cmd.entry;
        sqlx::query(
            r#"
            INSERT INTO events_log (token_id, event_kind, event_data, processed_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(e.token_id)
        .bind(e.event_kind)
        .bind(Json(e.event_data))
        .bind(e.processed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InsertTokenAnalytic {
    pub analytic: TokenAnalytic,
}

impl Processor<InsertTokenAnalytic> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertTokenAnalytic")]
    async fn process(&self, cmd: InsertTokenAnalytic) -> Result<(), sqlx::Error> {
        let a = cmd.analytic;
        sqlx::query(
            r#"
            INSERT INTO token_analytics (token_id, metric_name, metric_value, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(a.token_id)
        .bind(a.metric_name)
        .bind(a.metric_value)
        .bind(a.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Most recent analytics rows for a token, optionally for a single metric.
pub struct ListTokenAnalytics {
    pub token_id: String,
    pub metric_name: Option<String>,
    pub limit: i64,
}

impl Processor<ListTokenAnalytics> for DatabaseProcessor {
    type Output = Vec<TokenAnalytic>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListTokenAnalytics")]
    async fn process(&self, query: ListTokenAnalytics) -> Result<Vec<TokenAnalytic>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TokenAnalytic>(
            r#"
            SELECT token_id, metric_name, metric_value, created_at
            FROM token_analytics
            WHERE token_id = $1
              AND ($2::TEXT IS NULL OR metric_name = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(query.token_id)
        .bind(query.metric_name)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
