//! Database commands, one struct per query, executed through
//! [`DatabaseProcessor`](crate::framework::DatabaseProcessor).

pub mod analytics;
pub mod context;
pub mod metric;
pub mod queue;
pub mod thought;

pub use analytics::{EventLogEntry, TokenAnalytic};
pub use metric::ProcessingMetric;
pub use thought::AnalysisResult;
