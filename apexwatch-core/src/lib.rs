#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod entities;
pub mod events;
pub mod framework;
pub mod processors;
pub mod queue;
pub mod reasoning;
pub mod store;
