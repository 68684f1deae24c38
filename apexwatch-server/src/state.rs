//! Application state shared across all request handlers.

use apexwatch_core::config::{ServerConfig, SharedConfig};
use apexwatch_core::queue::EventQueue;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used by the read-only query handlers.
    pub db: PgPool,
    /// Runtime configuration (the server section can be reloaded via SIGHUP).
    pub config: SharedConfig,
    /// Queue that ingested events are published to.
    pub queue: Arc<dyn EventQueue>,
}

impl AppState {
    pub fn new(db: PgPool, config: SharedConfig, queue: Arc<dyn EventQueue>) -> Self {
        Self { db, config, queue }
    }

    /// Replace the server section (used during SIGHUP reload).
    pub async fn update_server_config(&self, server: ServerConfig) {
        *self.config.server.write().await = server;
    }
}
