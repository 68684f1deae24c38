//! EventProcessor.
//!
//! Runs one queued event through the pipeline:
//! - parse the envelope, dropping it when it has no `token_id`
//! - load the token's context, refreshing it from the producers if stale
//! - ask the reasoning client for an analysis
//! - store the analysis, fold it into the context, log the event and any
//!   analytics it carries
//! - record a processing metric
//!
//! Only a failed analysis fails the event (and gets it requeued). Storage
//! failures after that point are logged and the remaining steps still run.

use crate::context::ContextStore;
use crate::entities::{AnalysisResult, EventLogEntry, ProcessingMetric, TokenAnalytic};
use crate::events::{Event, EventEnvelope, EventKind, EventPayload, MalformedEvent};
use crate::queue::QueueMessage;
use crate::reasoning::{Analysis, AnalysisError, ReasoningClient, prompt};
use crate::store::ResultStore;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
}

/// What happened to an event that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Analyzed {
        token_id: String,
        provider_used: String,
    },
    /// Malformed and discarded. Not retried, not metered.
    Dropped(MalformedEvent),
}

pub struct EventProcessor {
    context: ContextStore,
    reasoning: ReasoningClient,
    results: Arc<dyn ResultStore>,
}

impl EventProcessor {
    pub fn new(
        context: ContextStore,
        reasoning: ReasoningClient,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            context,
            reasoning,
            results,
        }
    }

    async fn analyze(&self, event: &Event, event_prompt: &str) -> Result<Analysis, AnalysisError> {
        let mut context = self.context.load(&event.token_id).await;
        if self.context.is_stale(&context) {
            info!(token_id = %event.token_id, "Context is stale, refreshing");
            context = self.context.refresh(&event.token_id, event.kind()).await;
        }
        self.reasoning.analyze(event_prompt, &context.summary).await
    }

    async fn persist(
        &self,
        envelope: &EventEnvelope,
        event: &Event,
        event_prompt: String,
        analysis: &Analysis,
    ) {
        let now = OffsetDateTime::now_utc();
        let token_id = &event.token_id;

        let result = AnalysisResult {
            id: Uuid::now_v7(),
            token_id: token_id.clone(),
            event_kind: envelope.kind.clone(),
            prompt_text: event_prompt,
            analysis_text: analysis.analysis_text.clone(),
            provider_used: analysis.provider_used.clone(),
            tokens_used: analysis.tokens_used,
            latency_ms: analysis.latency_ms,
            created_at: now,
        };
        if let Err(e) = self.results.store_thought(result).await {
            error!(token_id = %token_id, error = %e, "Failed to store analysis");
        }

        if let Err(e) = self
            .context
            .append(token_id, &analysis.analysis_text, &envelope.kind)
            .await
        {
            error!(token_id = %token_id, error = %e, "Failed to update context");
        }

        let entry = EventLogEntry {
            token_id: token_id.clone(),
            event_kind: envelope.kind.clone(),
            event_data: envelope.data.clone(),
            processed_at: now,
        };
        if let Err(e) = self.results.store_event_log(entry).await {
            error!(token_id = %token_id, error = %e, "Failed to write event log");
        }

        for analytic in derived_analytics(event, now) {
            if let Err(e) = self.results.store_analytic(analytic).await {
                error!(token_id = %token_id, error = %e, "Failed to write analytics");
            }
        }
    }

    async fn record_metric(
        &self,
        kind: &str,
        started: Instant,
        queue_wait_ms: i64,
        error_message: Option<String>,
    ) {
        let metric = ProcessingMetric {
            id: Uuid::now_v7(),
            event_kind: kind.to_string(),
            latency_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
            queue_wait_ms,
            success: error_message.is_none(),
            error_message,
            created_at: OffsetDateTime::now_utc(),
        };
        if let Err(e) = self.results.record_metric(metric).await {
            error!(kind, error = %e, "Failed to record processing metric");
        }
    }
}

/// Numeric data points carried by an event. Only price changes with a
/// numeric new price produce one.
fn derived_analytics(event: &Event, now: OffsetDateTime) -> Vec<TokenAnalytic> {
    let EventPayload::PriceChange(change) = &event.payload else {
        return Vec::new();
    };
    let Some(price) = change.new_price.as_ref().and_then(|n| to_decimal(&n.to_string())) else {
        return Vec::new();
    };
    vec![TokenAnalytic {
        token_id: event.token_id.clone(),
        metric_name: "price".to_string(),
        metric_value: price,
        created_at: now,
    }]
}

fn to_decimal(text: &str) -> Option<Decimal> {
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

impl Processor<QueueMessage> for EventProcessor {
    type Output = ProcessOutcome;
    type Error = ProcessError;

    #[tracing::instrument(
        skip_all,
        err,
        name = "ProcessEvent",
        fields(tag = %message.delivery_tag, kind = %message.envelope.kind)
    )]
    async fn process(&self, message: QueueMessage) -> Result<ProcessOutcome, ProcessError> {
        let started = Instant::now();
        let queue_wait_ms = message.queue_wait_ms(OffsetDateTime::now_utc());
        let envelope = message.envelope;

        let event = match Event::from_envelope(&envelope) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, data = ?envelope.data, "Dropping malformed event");
                return Ok(ProcessOutcome::Dropped(e));
            }
        };
        if event.kind() == EventKind::Unknown {
            warn!(token_id = %event.token_id, "Unrecognized event kind, analyzing raw payload");
        }

        let event_prompt = prompt::build_event_prompt(&event);
        let analysis = match self.analyze(&event, &event_prompt).await {
            Ok(analysis) => analysis,
            Err(e) => {
                error!(token_id = %event.token_id, error = %e, "Event processing failed");
                self.record_metric(&envelope.kind, started, queue_wait_ms, Some(e.to_string()))
                    .await;
                return Err(e.into());
            }
        };

        self.persist(&envelope, &event, event_prompt, &analysis).await;
        self.record_metric(&envelope.kind, started, queue_wait_ms, None)
            .await;

        info!(
            token_id = %event.token_id,
            provider = %analysis.provider_used,
            latency_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
            "Event processed"
        );
        Ok(ProcessOutcome::Analyzed {
            token_id: event.token_id,
            provider_used: analysis.provider_used,
        })
    }
}
