//! Long-running pipeline stages.
//!
//! - `QueueConsumer`: claims queued events one at a time, acks or requeues
//! - `EventProcessor`: turns one event into an analysis and its side records

pub mod event_processor;
pub mod queue_consumer;

pub use event_processor::{EventProcessor, ProcessError, ProcessOutcome};
pub use queue_consumer::QueueConsumer;
