//! Configuration types for the ApexWatch core.
//!
//! These types represent the validated runtime configuration. The actual
//! config loading/parsing is handled by the server crate.

mod pipeline;
mod reasoning;
mod server;

pub use pipeline::{ContextConfig, ProducersConfig, QueueConfig};
pub use reasoning::{ProviderConfig, ProviderKind, ReasoningConfig};
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Configuration sections that can be swapped at runtime (SIGHUP).
///
/// Pipeline settings are fixed at startup and are not part of this.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address, access key).
    pub server: Arc<RwLock<ServerConfig>>,
}

impl SharedConfig {
    pub fn new(server: ServerConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
        }
    }
}
