use apexwatch_core::config::ContextConfig;
use apexwatch_core::context::{
    ContextBackend, ContextStore, EnrichmentSource, Enricher, MemoryContextBackend, NoEnrichment,
};
use apexwatch_core::events::{EventEnvelope, EventKind, MalformedEvent};
use apexwatch_core::processors::{EventProcessor, ProcessError, ProcessOutcome};
use apexwatch_core::queue::{EventQueue, MemoryEventQueue, QueueMessage};
use apexwatch_core::reasoning::{Completion, Provider, ProviderError, ReasoningClient, RetryPolicy};
use apexwatch_core::store::MemoryResultStore;
use async_trait::async_trait;
use kanau::processor::Processor;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Answers every prompt with the same text and remembers the prompts.
struct StubProvider {
    name: &'static str,
    reply: Option<(&'static str, i64)>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl StubProvider {
    fn answering(name: &'static str, text: &'static str, tokens: i64) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Some((text, tokens)),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        })
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> String {
        self.name.to_string()
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.to_string());
        match self.reply {
            Some((text, tokens)) => Ok(Completion {
                text: text.to_string(),
                tokens_used: tokens,
            }),
            None => Err(ProviderError::Other("connection refused".to_string())),
        }
    }
}

struct MarketSnapshot;

#[async_trait]
impl Enricher for MarketSnapshot {
    async fn fetch(&self, source: EnrichmentSource, _token_id: &str) -> Option<String> {
        (source == EnrichmentSource::Market).then(|| r#"{"price":1.02}"#.to_string())
    }
}

struct Harness {
    queue: Arc<MemoryEventQueue>,
    contexts: Arc<MemoryContextBackend>,
    results: Arc<MemoryResultStore>,
    processor: EventProcessor,
}

fn harness(providers: Vec<Arc<dyn Provider>>, enricher: Arc<dyn Enricher>) -> Harness {
    let queue = Arc::new(MemoryEventQueue::new());
    let contexts = Arc::new(MemoryContextBackend::new());
    let results = Arc::new(MemoryResultStore::new());
    let context = ContextStore::new(contexts.clone(), enricher, ContextConfig::default());
    let reasoning =
        ReasoningClient::new(providers, RetryPolicy::default(), Duration::from_secs(120));
    let processor = EventProcessor::new(context, reasoning, results.clone());
    Harness {
        queue,
        contexts,
        results,
        processor,
    }
}

fn envelope(value: Value) -> EventEnvelope {
    serde_json::from_value(value).unwrap()
}

fn wallet_transfer(token_id: &str) -> EventEnvelope {
    envelope(json!({
        "kind": "wallet_transfer",
        "data": {
            "token_id": token_id,
            "from_address": "0xA",
            "to_address": "0xB",
            "amount": 5000
        }
    }))
}

impl Harness {
    async fn deliver(&self, envelope: EventEnvelope) -> QueueMessage {
        self.queue.publish(envelope).await.unwrap();
        self.queue.receive().await.unwrap().unwrap()
    }
}

#[tokio::test]
async fn wallet_transfer_end_to_end() {
    let provider = StubProvider::answering("ollama-llama3", "Large transfer noted", 42);
    let h = harness(vec![provider.clone() as Arc<dyn Provider>], Arc::new(NoEnrichment));

    let message = h.deliver(wallet_transfer("t1")).await;
    let outcome = h.processor.process(message).await.unwrap();
    assert_eq!(
        outcome,
        ProcessOutcome::Analyzed {
            token_id: "t1".to_string(),
            provider_used: "ollama-llama3".to_string(),
        }
    );

    let thoughts = h.results.thoughts().await;
    assert_eq!(thoughts.len(), 1);
    assert_eq!(thoughts[0].token_id, "t1");
    assert_eq!(thoughts[0].event_kind, "wallet_transfer");
    assert_eq!(thoughts[0].analysis_text, "Large transfer noted");
    assert_eq!(thoughts[0].provider_used, "ollama-llama3");
    assert_eq!(thoughts[0].tokens_used, 42);
    assert!(thoughts[0].prompt_text.contains("- Amount: 5000 tokens"));

    let context = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(context.event_count, 1);
    assert_eq!(context.last_event_kind, Some(EventKind::WalletTransfer));
    assert_eq!(context.summary, "\n[wallet_transfer]: Large transfer noted...");

    let metrics = h.results.metrics().await;
    assert_eq!(metrics.len(), 1);
    assert!(metrics[0].success);
    assert_eq!(metrics[0].event_kind, "wallet_transfer");
    assert_eq!(metrics[0].error_message, None);

    let logs = h.results.event_logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].event_data.get("amount"), Some(&json!(5000)));
    assert!(h.results.analytics().await.is_empty());

    // The prompt had no previous context to include.
    let prompts = provider.prompts.lock().await;
    assert!(prompts[0].contains("Event to Analyze:\nLarge wallet transfer detected:"));
}

#[tokio::test]
async fn redelivered_event_is_processed_again() {
    let provider = StubProvider::answering("ollama-llama3", "Noted", 1);
    let h = harness(vec![provider as Arc<dyn Provider>], Arc::new(NoEnrichment));

    let message = h.deliver(wallet_transfer("t1")).await;
    h.processor.process(message.clone()).await.unwrap();
    h.processor.process(message).await.unwrap();

    assert_eq!(h.results.thoughts().await.len(), 2);
    let context = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(context.event_count, 2);
    assert_eq!(
        context.summary,
        "\n[wallet_transfer]: Noted...\n[wallet_transfer]: Noted..."
    );
}

#[tokio::test]
async fn context_follows_processing_order() {
    let provider = StubProvider::answering("ollama-llama3", "ok", 1);
    let h = harness(vec![provider.clone() as Arc<dyn Provider>], Arc::new(NoEnrichment));

    let kinds = ["price_change", "news_update", "volume_spike"];
    let mut last_count = 0;
    for kind in kinds {
        let message = h
            .deliver(envelope(json!({"kind": kind, "data": {"token_id": "t1"}})))
            .await;
        h.processor.process(message).await.unwrap();

        let context = h.contexts.get("t1").await.unwrap().unwrap();
        assert!(context.event_count > last_count);
        last_count = context.event_count;
    }

    let context = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(context.event_count, 3);
    assert_eq!(context.last_event_kind, Some(EventKind::VolumeSpike));

    // Later prompts carry the accumulated context.
    let prompts = provider.prompts.lock().await;
    assert!(prompts[2].contains("Previous Context:\n\n[price_change]: ok...\n[news_update]: ok..."));
}

#[tokio::test(start_paused = true)]
async fn exhausted_providers_fail_the_event() {
    let primary = StubProvider::failing("ollama-llama3");
    let secondary = StubProvider::failing("openai-gpt-4");
    let h = harness(
        vec![primary.clone() as Arc<dyn Provider>, secondary.clone()],
        Arc::new(NoEnrichment),
    );

    let message = h.deliver(wallet_transfer("t1")).await;
    let err = h.processor.process(message).await.unwrap_err();
    assert!(matches!(err, ProcessError::Analysis(_)));

    assert_eq!(primary.calls.load(Ordering::SeqCst), 3);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    assert!(h.results.thoughts().await.is_empty());
    assert!(h.results.event_logs().await.is_empty());
    assert_eq!(h.contexts.get("t1").await.unwrap(), None);

    let metrics = h.results.metrics().await;
    assert_eq!(metrics.len(), 1);
    assert!(!metrics[0].success);
    let message = metrics[0].error_message.as_deref().unwrap();
    assert!(message.contains("ollama-llama3"));
    assert!(message.contains("openai-gpt-4"));
}

#[tokio::test]
async fn missing_token_id_is_dropped_without_metric() {
    let provider = StubProvider::answering("ollama-llama3", "unused", 1);
    let h = harness(vec![provider.clone() as Arc<dyn Provider>], Arc::new(NoEnrichment));

    let message = h
        .deliver(envelope(json!({"kind": "price_change", "data": {"new_price": 2}})))
        .await;
    let outcome = h.processor.process(message).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Dropped(MalformedEvent::MissingTokenId));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(h.results.metrics().await.is_empty());
    assert!(h.results.thoughts().await.is_empty());
}

#[tokio::test]
async fn stale_context_is_refreshed_from_producers() {
    let provider = StubProvider::answering("ollama-llama3", "Price up", 3);
    let h = harness(vec![provider.clone() as Arc<dyn Provider>], Arc::new(MarketSnapshot));

    let message = h
        .deliver(envelope(json!({
            "kind": "price_change",
            "data": {"token_id": "t1", "old_price": 1.0, "new_price": 1.02}
        })))
        .await;
    h.processor.process(message).await.unwrap();

    let prompts = provider.prompts.lock().await;
    assert!(prompts[0].contains("Previous Context:\n\nLatest Market: {\"price\":1.02}"));

    // The refreshed snapshot is only used for the prompt.
    let context = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(context.summary, "\n[price_change]: Price up...");

    let analytics = h.results.analytics().await;
    assert_eq!(analytics.len(), 1);
    assert_eq!(analytics[0].metric_name, "price");
    assert_eq!(analytics[0].metric_value.to_string(), "1.02");
}

#[tokio::test]
async fn storage_failures_do_not_fail_the_event() {
    let provider = StubProvider::answering("ollama-llama3", "Still analyzed", 5);
    let h = harness(vec![provider as Arc<dyn Provider>], Arc::new(NoEnrichment));
    h.results.set_unavailable(true).await;

    let message = h.deliver(wallet_transfer("t1")).await;
    let outcome = h.processor.process(message).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Analyzed { .. }));

    // The context write is independent of the result store.
    let context = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(context.event_count, 1);
    assert!(h.results.thoughts().await.is_empty());
}

#[tokio::test]
async fn unknown_kind_is_analyzed_with_raw_payload() {
    let provider = StubProvider::answering("ollama-llama3", "Unclear", 1);
    let h = harness(vec![provider.clone() as Arc<dyn Provider>], Arc::new(NoEnrichment));

    let message = h
        .deliver(envelope(json!({"kind": "whale_alert", "data": {"token_id": "t1"}})))
        .await;
    h.processor.process(message).await.unwrap();

    let prompts = provider.prompts.lock().await;
    assert!(prompts[0].contains("Unknown event type: whale_alert\nData: {\"token_id\":\"t1\"}"));
    let context = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(context.last_event_kind, Some(EventKind::Unknown));
    assert!(context.summary.starts_with("\n[whale_alert]: "));
}

#[tokio::test]
async fn unavailable_context_store_does_not_fail_the_event() {
    let provider = StubProvider::answering("ollama-llama3", "Analyzed without history", 3);
    let h = harness(vec![provider.clone() as Arc<dyn Provider>], Arc::new(NoEnrichment));
    h.contexts.set_unavailable(true).await;

    let message = h.deliver(wallet_transfer("t1")).await;
    let outcome = h.processor.process(message).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Analyzed { .. }));

    assert_eq!(h.results.thoughts().await.len(), 1);
    let metrics = h.results.metrics().await;
    assert_eq!(metrics.len(), 1);
    assert!(metrics[0].success);
    assert_eq!(provider.prompts.lock().await.len(), 1);

    h.contexts.set_unavailable(false).await;
    assert_eq!(h.contexts.get("t1").await.unwrap(), None);
}

#[tokio::test]
async fn failed_context_read_keeps_stored_history() {
    let provider = StubProvider::answering("ollama-llama3", "Transfer noted", 3);
    let h = harness(vec![provider as Arc<dyn Provider>], Arc::new(NoEnrichment));

    let message = h.deliver(wallet_transfer("t1")).await;
    h.processor.process(message).await.unwrap();
    let before = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(before.event_count, 1);

    // The load degrades to an empty context and the append read then fails.
    h.contexts.fail_next_reads(2).await;
    let message = h.deliver(wallet_transfer("t1")).await;
    let outcome = h.processor.process(message).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Analyzed { .. }));

    let after = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(after.event_count, 1);
    assert_eq!(after.summary, before.summary);
    assert_eq!(h.results.thoughts().await.len(), 2);
    let metrics = h.results.metrics().await;
    assert_eq!(metrics.len(), 2);
    assert!(metrics.iter().all(|m| m.success));

    let message = h.deliver(wallet_transfer("t1")).await;
    h.processor.process(message).await.unwrap();
    let context = h.contexts.get("t1").await.unwrap().unwrap();
    assert_eq!(context.event_count, 2);
    assert!(context.summary.starts_with(&before.summary));
}
