pub mod analytics;
pub mod context;
pub mod event;
pub mod queue;
pub mod thought;

pub use analytics::{AnalyticResponse, AnalyticsPage, AnalyticsQuery};
pub use context::{ContextResponse, ContextSnapshot};
pub use event::{EventEnvelope, EventKind};
pub use queue::{QueueStatusResponse, QueuedResponse};
pub use thought::{ListThoughtsQuery, ThoughtResponse, ThoughtsPage, clamp_pagination};
