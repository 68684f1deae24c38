use super::{Context, ContextError};
use crate::entities::context::{GetTokenContext, TokenContextRow, UpsertTokenContext};
use crate::events::EventKind;
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;

/// Raw storage for contexts with per-entry expiry.
#[async_trait]
pub trait ContextBackend: Send + Sync {
    /// Expired entries read as `None`.
    async fn get(&self, token_id: &str) -> Result<Option<Context>, ContextError>;

    /// Store `context`, replacing any previous value, expiring after `ttl`.
    async fn put(&self, token_id: &str, context: &Context, ttl: Duration)
    -> Result<(), ContextError>;
}

pub struct PgContextBackend {
    db: DatabaseProcessor,
}

impl PgContextBackend {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

impl From<TokenContextRow> for Context {
    fn from(row: TokenContextRow) -> Self {
        Self {
            summary: row.summary,
            last_updated: row.last_updated,
            event_count: row.event_count,
            last_event_kind: row.last_event_kind.as_deref().map(EventKind::from),
        }
    }
}

#[async_trait]
impl ContextBackend for PgContextBackend {
    async fn get(&self, token_id: &str) -> Result<Option<Context>, ContextError> {
        let row = self
            .db
            .process(GetTokenContext {
                token_id: token_id.to_string(),
            })
            .await?;
        Ok(row.map(Context::from))
    }

    async fn put(
        &self,
        token_id: &str,
        context: &Context,
        ttl: Duration,
    ) -> Result<(), ContextError> {
        let row = TokenContextRow {
            token_id: token_id.to_string(),
            summary: context.summary.clone(),
            last_updated: context.last_updated,
            event_count: context.event_count,
            last_event_kind: context.last_event_kind.map(|k| k.as_str().to_string()),
            expires_at: OffsetDateTime::now_utc() + ttl,
        };
        self.db.process(UpsertTokenContext { row }).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, (Context, OffsetDateTime)>,
    unavailable: bool,
    failing_reads: usize,
}

/// Contexts kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryContextBackend {
    state: Mutex<MemoryState>,
}

impl MemoryContextBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read and write fail until switched back.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Make the next `n` reads fail. Writes are unaffected.
    pub async fn fail_next_reads(&self, n: usize) {
        self.state.lock().await.failing_reads = n;
    }
}

#[async_trait]
impl ContextBackend for MemoryContextBackend {
    async fn get(&self, token_id: &str) -> Result<Option<Context>, ContextError> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            return Err(ContextError::Unavailable);
        }
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(ContextError::Unavailable);
        }
        let now = OffsetDateTime::now_utc();
        Ok(state
            .entries
            .get(token_id)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(context, _)| context.clone()))
    }

    async fn put(
        &self,
        token_id: &str,
        context: &Context,
        ttl: Duration,
    ) -> Result<(), ContextError> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            return Err(ContextError::Unavailable);
        }
        let expires_at = OffsetDateTime::now_utc() + ttl;
        state
            .entries
            .insert(token_id.to_string(), (context.clone(), expires_at));
        Ok(())
    }
}
