//! Queue, context and producer settings for the event pipeline.

use std::time::Duration;
use url::Url;

/// Consumer loop timing.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long the consumer sleeps when the queue is empty.
    pub poll_interval: Duration,
    /// Pause after a failed delivery before accepting the next one.
    pub failure_pause: Duration,
    /// A claimed message that is neither acked nor nacked within this window
    /// becomes deliverable again.
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            failure_pause: Duration::from_secs(5),
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

/// Per-token context lifecycle.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Contexts older than this are refreshed before use.
    pub staleness_window: Duration,
    /// Upper bound on the summary size in bytes.
    pub max_summary_bytes: usize,
    /// Contexts expire this long after their last write.
    pub retention: Duration,
    /// Characters of each analysis kept in the summary.
    pub excerpt_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            staleness_window: Duration::from_secs(60 * 60),
            max_summary_bytes: 500 * 1024,
            retention: Duration::from_secs(24 * 60 * 60),
            excerpt_chars: 200,
        }
    }
}

/// Producer services queried for enrichment snapshots.
#[derive(Debug, Clone)]
pub struct ProducersConfig {
    pub exchange_monitor_url: Url,
    pub news_monitor_url: Url,
    pub wallet_monitor_url: Url,
    /// Access key sent to the producers.
    pub access_key: String,
    pub timeout: Duration,
}
