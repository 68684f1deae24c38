use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// Persisted output of one successful reasoning call. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub token_id: String,
    pub event_kind: String,
    #[sqlx(rename = "prompt")]
    pub prompt_text: String,
    #[sqlx(rename = "thought")]
    pub analysis_text: String,
    pub provider_used: String,
    pub tokens_used: i64,
    pub latency_ms: i64,
    pub created_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct InsertThought {
    pub result: AnalysisResult,
}

impl Processor<InsertThought> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertThought")]
    async fn process(&self, cmd: InsertThought) -> Result<(), sqlx::Error> {
        let r = cmd.result;
        sqlx::query(
            r#"
            INSERT INTO llm_thoughts
                (id, token_id, event_kind, prompt, thought, provider_used, tokens_used, latency_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(r.id)
        .bind(r.token_id)
        .bind(r.event_kind)
        .bind(r.prompt_text)
        .bind(r.analysis_text)
        .bind(r.provider_used)
        .bind(r.tokens_used)
        .bind(r.latency_ms)
        .bind(r.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// A page of a token's thoughts, newest first.
pub struct ListThoughts {
    pub token_id: String,
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListThoughts> for DatabaseProcessor {
    type Output = Vec<AnalysisResult>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListThoughts")]
    async fn process(&self, query: ListThoughts) -> Result<Vec<AnalysisResult>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AnalysisResult>(
            r#"
            SELECT id, token_id, event_kind, prompt, thought, provider_used,
                   tokens_used, latency_ms, created_at
            FROM llm_thoughts
            WHERE token_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query.token_id)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
