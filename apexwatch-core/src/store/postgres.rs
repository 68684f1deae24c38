use super::{ResultStore, StoreError};
use crate::entities::analytics::{InsertEventLog, InsertTokenAnalytic};
use crate::entities::metric::InsertProcessingMetric;
use crate::entities::thought::InsertThought;
use crate::entities::{AnalysisResult, EventLogEntry, ProcessingMetric, TokenAnalytic};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;

pub struct PgResultStore {
    db: DatabaseProcessor,
}

impl PgResultStore {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn store_thought(&self, result: AnalysisResult) -> Result<(), StoreError> {
        Ok(self.db.process(InsertThought { result }).await?)
    }

    async fn store_event_log(&self, entry: EventLogEntry) -> Result<(), StoreError> {
        Ok(self.db.process(InsertEventLog { entry }).await?)
    }

    async fn store_analytic(&self, analytic: TokenAnalytic) -> Result<(), StoreError> {
        Ok(self.db.process(InsertTokenAnalytic { analytic }).await?)
    }

    async fn record_metric(&self, metric: ProcessingMetric) -> Result<(), StoreError> {
        Ok(self.db.process(InsertProcessingMetric { metric }).await?)
    }
}
