//! Sinks for processing output: analyses, the event log, derived analytics
//! and per-event metrics. All writes are append-only.

mod memory;
mod postgres;

pub use memory::MemoryResultStore;
pub use postgres::PgResultStore;

use crate::entities::{AnalysisResult, EventLogEntry, ProcessingMetric, TokenAnalytic};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("result store unavailable")]
    Unavailable,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn store_thought(&self, result: AnalysisResult) -> Result<(), StoreError>;

    async fn store_event_log(&self, entry: EventLogEntry) -> Result<(), StoreError>;

    async fn store_analytic(&self, analytic: TokenAnalytic) -> Result<(), StoreError>;

    async fn record_metric(&self, metric: ProcessingMetric) -> Result<(), StoreError>;
}
