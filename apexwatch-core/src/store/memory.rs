use super::{ResultStore, StoreError};
use crate::entities::{AnalysisResult, EventLogEntry, ProcessingMetric, TokenAnalytic};
use async_trait::async_trait;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Records {
    thoughts: Vec<AnalysisResult>,
    event_logs: Vec<EventLogEntry>,
    analytics: Vec<TokenAnalytic>,
    metrics: Vec<ProcessingMetric>,
    unavailable: bool,
}

/// Keeps everything in memory, in write order.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: Mutex<Records>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail until switched back.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.records.lock().await.unavailable = unavailable;
    }

    pub async fn thoughts(&self) -> Vec<AnalysisResult> {
        self.records.lock().await.thoughts.clone()
    }

    pub async fn event_logs(&self) -> Vec<EventLogEntry> {
        self.records.lock().await.event_logs.clone()
    }

    pub async fn analytics(&self) -> Vec<TokenAnalytic> {
        self.records.lock().await.analytics.clone()
    }

    pub async fn metrics(&self) -> Vec<ProcessingMetric> {
        self.records.lock().await.metrics.clone()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn store_thought(&self, result: AnalysisResult) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if records.unavailable {
            return Err(StoreError::Unavailable);
        }
        records.thoughts.push(result);
        Ok(())
    }

    async fn store_event_log(&self, entry: EventLogEntry) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if records.unavailable {
            return Err(StoreError::Unavailable);
        }
        records.event_logs.push(entry);
        Ok(())
    }

    async fn store_analytic(&self, analytic: TokenAnalytic) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if records.unavailable {
            return Err(StoreError::Unavailable);
        }
        records.analytics.push(analytic);
        Ok(())
    }

    async fn record_metric(&self, metric: ProcessingMetric) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if records.unavailable {
            return Err(StoreError::Unavailable);
        }
        records.metrics.push(metric);
        Ok(())
    }
}
