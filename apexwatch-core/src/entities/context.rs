use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// A row of `token_contexts`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TokenContextRow {
    pub token_id: String,
    pub summary: String,
    pub last_updated: Option<time::OffsetDateTime>,
    pub event_count: i64,
    pub last_event_kind: Option<String>,
    pub expires_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
/// Fetch a token's context unless it has expired.
pub struct GetTokenContext {
    pub token_id: String,
}

impl Processor<GetTokenContext> for DatabaseProcessor {
    type Output = Option<TokenContextRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTokenContext")]
    async fn process(&self, query: GetTokenContext) -> Result<Option<TokenContextRow>, sqlx::Error> {
        let row = sqlx::query_as::<_, TokenContextRow>(
            r#"
            SELECT token_id, summary, last_updated, event_count, last_event_kind, expires_at
            FROM token_contexts
            WHERE token_id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(query.token_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[derive(Debug, Clone)]
/// Write a token's context, replacing whatever is stored.
pub struct UpsertTokenContext {
    pub row: TokenContextRow,
}

impl Processor<UpsertTokenContext> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertTokenContext")]
    async fn process(&self, cmd: UpsertTokenContext) -> Result<(), sqlx::Error> {
        let TokenContextRow {
            token_id,
            summary,
            last_updated,
            event_count,
            last_event_kind,
            expires_at,
        } = cmd.row;
        sqlx::query(
            r#"
            INSERT INTO token_contexts
                (token_id, summary, last_updated, event_count, last_event_kind, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (token_id) DO UPDATE SET
                summary = EXCLUDED.summary,
                last_updated = EXCLUDED.last_updated,
                event_count = EXCLUDED.event_count,
                last_event_kind = EXCLUDED.last_event_kind,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(token_id)
        .bind(summary)
        .bind(last_updated)
        .bind(event_count)
        .bind(last_event_kind)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Drop expired contexts. Returns the number of rows removed.
#[derive(Debug, Clone)]
pub struct PurgeExpiredContexts;

impl Processor<PurgeExpiredContexts> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:PurgeExpiredContexts")]
    async fn process(&self, _cmd: PurgeExpiredContexts) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM token_contexts WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
