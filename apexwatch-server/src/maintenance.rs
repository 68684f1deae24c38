//! Periodic housekeeping that runs next to the consumer.

use apexwatch_core::entities::context::PurgeExpiredContexts;
use apexwatch_core::framework::DatabaseProcessor;
use kanau::processor::Processor;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Delete expired token contexts every `interval` until shutdown.
///
/// Reads already ignore expired rows; this only keeps the table small.
pub fn spawn_context_purge(
    db: DatabaseProcessor,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("Context purge task shutting down");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    match db.process(PurgeExpiredContexts).await {
                        Ok(0) => {}
                        Ok(purged) => tracing::info!(purged, "Purged expired contexts"),
                        Err(e) => tracing::warn!(error = %e, "Failed to purge expired contexts"),
                    }
                }
            }
        }
    })
}
