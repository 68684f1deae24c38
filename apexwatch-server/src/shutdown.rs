//! Signal handling for graceful shutdown and config reload.

use crate::config::ConfigLoader;
use crate::state::AppState;
use std::sync::Arc;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::Notify;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() {
    let mut sigterm = install(SignalKind::terminate(), "SIGTERM");
    let mut sigint = install(SignalKind::interrupt(), "SIGINT");

    tokio::select! {
        _ = recv(&mut sigterm) => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = recv(&mut sigint) => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

fn install(kind: SignalKind, name: &str) -> Option<Signal> {
    match signal(kind) {
        Ok(signal) => Some(signal),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install {} handler", name);
            None
        }
    }
}

/// Waits for the next delivery, or forever if the handler is missing.
async fn recv(signal: &mut Option<Signal>) {
    match signal {
        Some(signal) => {
            signal.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Spawns a task that listens for SIGHUP and reloads the configuration.
///
/// Only the server section (listen address aside, which needs a rebind) is
/// swapped in. Queue, context and reasoning settings are read once at
/// startup. Returns a Notify that stops the task.
pub fn spawn_config_reload_handler(state: AppState, config_loader: Arc<ConfigLoader>) -> Arc<Notify> {
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    tokio::spawn(async move {
        let mut sighup = install(SignalKind::hangup(), "SIGHUP");

        loop {
            tokio::select! {
                _ = recv(&mut sighup) => {
                    tracing::info!("Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded_config) => {
                            state.update_server_config(loaded_config.server).await;
                            tracing::info!("Configuration reloaded successfully");
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
                _ = shutdown_notify_clone.notified() => {
                    tracing::debug!("Config reload handler shutting down");
                    break;
                }
            }
        }
    });

    shutdown_notify
}
