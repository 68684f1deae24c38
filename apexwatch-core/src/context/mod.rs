//! Per-token rolling context.
//!
//! The summary accumulates short excerpts of past analyses so the next
//! analysis of the same token can take them into account. It is bounded in
//! size, expires after a period without writes and is replaced by a fresh
//! snapshot from the producers when it goes stale.
//!
//! Writes are last-write-wins. Correctness relies on a single consumer
//! processing events, there is no per-token lock.

mod backend;
mod enrichment;

pub use backend::{ContextBackend, MemoryContextBackend, PgContextBackend};
pub use enrichment::{EnrichmentSource, Enricher, HttpEnricher, NoEnrichment};

use crate::config::ContextConfig;
use crate::events::EventKind;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("context backend unavailable")]
    Unavailable,
}

/// Rolling knowledge about one token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub summary: String,
    /// `None` until the first write. Never moves backwards.
    pub last_updated: Option<OffsetDateTime>,
    pub event_count: i64,
    pub last_event_kind: Option<EventKind>,
}

impl Context {
    /// A context is stale when it was never written or when its last write
    /// is older than `window`.
    pub fn is_stale(&self, window: Duration, now: OffsetDateTime) -> bool {
        match self.last_updated {
            None => true,
            Some(last_updated) => last_updated < now - window,
        }
    }

    /// Record one processed event: append an excerpt of the analysis, keep the
    /// summary within `max_bytes` and bump the counters.
    pub fn record(
        &mut self,
        analysis_text: &str,
        kind: &str,
        excerpt_chars: usize,
        max_bytes: usize,
        now: OffsetDateTime,
    ) {
        let excerpt: String = analysis_text.chars().take(excerpt_chars).collect();
        self.summary.push_str(&format!("\n[{kind}]: {excerpt}..."));
        truncate_front(&mut self.summary, max_bytes);

        self.event_count += 1;
        self.last_event_kind = Some(EventKind::from(kind));
        self.last_updated = Some(match self.last_updated {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }
}

/// Drop bytes from the front of `text` until it fits in `max_bytes`, cutting
/// on a character boundary. The result may be a few bytes under budget.
pub fn truncate_front(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text.drain(..start);
}

/// Reads, refreshes and updates token contexts.
#[derive(Clone)]
pub struct ContextStore {
    backend: Arc<dyn ContextBackend>,
    enricher: Arc<dyn Enricher>,
    config: ContextConfig,
}

impl ContextStore {
    pub fn new(
        backend: Arc<dyn ContextBackend>,
        enricher: Arc<dyn Enricher>,
        config: ContextConfig,
    ) -> Self {
        Self {
            backend,
            enricher,
            config,
        }
    }

    /// The stored context, or an empty one if there is none. Read errors are
    /// logged and treated as absence.
    pub async fn load(&self, token_id: &str) -> Context {
        match self.backend.get(token_id).await {
            Ok(Some(context)) => context,
            Ok(None) => Context::default(),
            Err(e) => {
                warn!(token_id, error = %e, "Failed to load context, starting empty");
                Context::default()
            }
        }
    }

    pub fn is_stale(&self, context: &Context) -> bool {
        context.is_stale(self.config.staleness_window, OffsetDateTime::now_utc())
    }

    /// Build a context from the producers' latest snapshot for this kind of
    /// event. Unreachable producers leave the summary empty. The result is
    /// not stored.
    pub async fn refresh(&self, token_id: &str, kind: EventKind) -> Context {
        let mut summary = String::new();
        if let Some(source) = EnrichmentSource::for_kind(kind) {
            match self.enricher.fetch(source, token_id).await {
                Some(snapshot) => {
                    summary.push_str(&format!("\n{} {snapshot}", source.label()));
                }
                None => debug!(token_id, ?source, "No enrichment snapshot available"),
            }
        }
        Context {
            summary,
            last_updated: Some(OffsetDateTime::now_utc()),
            event_count: 0,
            last_event_kind: None,
        }
    }

    /// Fold an analysis into the stored context and write it back.
    ///
    /// Unlike [`load`](Self::load), a read error is returned: writing on top
    /// of an empty context would wipe the stored summary and counters.
    pub async fn append(
        &self,
        token_id: &str,
        analysis_text: &str,
        kind: &str,
    ) -> Result<Context, ContextError> {
        let mut context = self.backend.get(token_id).await?.unwrap_or_default();
        context.record(
            analysis_text,
            kind,
            self.config.excerpt_chars,
            self.config.max_summary_bytes,
            OffsetDateTime::now_utc(),
        );
        self.backend
            .put(token_id, &context, self.config.retention)
            .await?;
        Ok(context)
    }
}
