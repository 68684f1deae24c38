//! QueueConsumer.
//!
//! Pulls one message at a time from the event queue and hands it to a
//! handler. Success acks the message; failure nacks it back onto the queue
//! and pauses before the next delivery so a persistently failing dependency
//! is not hammered. Shutdown is only observed between deliveries.

use crate::config::QueueConfig;
use crate::queue::{EventQueue, QueueMessage};
use kanau::processor::Processor;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub struct QueueConsumer {
    queue: Arc<dyn EventQueue>,
    config: QueueConfig,
}

impl QueueConsumer {
    pub fn new(queue: Arc<dyn EventQueue>, config: QueueConfig) -> Self {
        Self { queue, config }
    }

    /// Run until the shutdown signal fires (or its sender goes away).
    pub async fn run<H>(self, handler: H, mut shutdown_rx: watch::Receiver<bool>)
    where
        H: Processor<QueueMessage>,
        H::Error: Display,
    {
        info!("QueueConsumer started");

        loop {
            if *shutdown_rx.borrow() {
                info!("QueueConsumer received shutdown signal");
                break;
            }

            let message = match self.queue.receive().await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    if wait_or_shutdown(self.config.poll_interval, &mut shutdown_rx).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive from event queue");
                    if wait_or_shutdown(self.config.failure_pause, &mut shutdown_rx).await {
                        break;
                    }
                    continue;
                }
            };

            let tag = message.delivery_tag;
            debug!(%tag, delivery_count = message.delivery_count, "Received event");

            match handler.process(message).await {
                Ok(_) => {
                    if let Err(e) = self.queue.ack(tag).await {
                        error!(%tag, error = %e, "Failed to ack event");
                    }
                }
                Err(e) => {
                    warn!(%tag, error = %e, "Event handler failed, requeueing");
                    if let Err(e) = self.queue.nack(tag, true).await {
                        error!(%tag, error = %e, "Failed to requeue event");
                    }
                    if wait_or_shutdown(self.config.failure_pause, &mut shutdown_rx).await {
                        break;
                    }
                }
            }
        }

        info!("QueueConsumer shutdown complete");
    }
}

/// Sleep for `duration`, returning early with `true` if shutdown is signaled.
async fn wait_or_shutdown(duration: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;

        changed = shutdown_rx.changed() => {
            // A dropped sender means nobody can ask us to stop any more.
            changed.is_err() || *shutdown_rx.borrow()
        }

        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventEnvelope;
    use crate::queue::MemoryEventQueue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Fails the first `failures` deliveries, then succeeds.
    struct FlakyHandler {
        failures: AtomicUsize,
        seen: Mutex<Vec<String>>,
        shutdown_after: usize,
        shutdown_tx: watch::Sender<bool>,
    }

    impl Processor<QueueMessage> for FlakyHandler {
        type Output = ();
        type Error = String;

        async fn process(&self, message: QueueMessage) -> Result<(), String> {
            let mut seen = self.seen.lock().await;
            seen.push(message.envelope.kind.clone());
            if seen.len() >= self.shutdown_after {
                let _ = self.shutdown_tx.send(true);
            }
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err("dependency down".to_string());
            }
            Ok(())
        }
    }

    fn envelope(kind: &str) -> EventEnvelope {
        EventEnvelope::new(kind, Default::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_event_is_redelivered_first() {
        let queue = Arc::new(MemoryEventQueue::new());
        queue.publish(envelope("price_change")).await.unwrap();
        queue.publish(envelope("news_update")).await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handler = FlakyHandler {
            failures: AtomicUsize::new(1),
            seen: Mutex::new(Vec::new()),
            shutdown_after: 3,
            shutdown_tx,
        };
        let consumer = QueueConsumer::new(queue.clone(), QueueConfig::default());
        let started = tokio::time::Instant::now();

        let handler = Arc::new(handler);
        consumer.run(SharedHandler(handler.clone()), shutdown_rx).await;

        assert_eq!(
            *handler.seen.lock().await,
            vec!["price_change", "price_change", "news_update"]
        );
        assert!(started.elapsed() >= QueueConfig::default().failure_pause);
        assert_eq!(queue.size().await.unwrap(), 0);
        assert_eq!(queue.in_flight().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_consumer_stops_on_shutdown() {
        let queue = Arc::new(MemoryEventQueue::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let consumer = QueueConsumer::new(queue, QueueConfig::default());
        let handler = FlakyHandler {
            failures: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            shutdown_after: usize::MAX,
            shutdown_tx: watch::channel(false).0,
        };

        let task = tokio::spawn(consumer.run(handler, shutdown_rx));
        tokio::time::sleep(Duration::from_secs(3)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_error_pauses_then_stops() {
        let queue = Arc::new(MemoryEventQueue::new());
        queue.close().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let consumer = QueueConsumer::new(queue, QueueConfig::default());
        let handler = FlakyHandler {
            failures: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            shutdown_after: usize::MAX,
            shutdown_tx: watch::channel(false).0,
        };

        let task = tokio::spawn(consumer.run(handler, shutdown_rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(shutdown_tx);
        task.await.unwrap();
    }

    struct SharedHandler(Arc<FlakyHandler>);

    impl Processor<QueueMessage> for SharedHandler {
        type Output = ();
        type Error = String;

        async fn process(&self, message: QueueMessage) -> Result<(), String> {
            self.0.process(message).await
        }
    }
}
