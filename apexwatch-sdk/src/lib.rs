//! Wire types shared between the ApexWatch core service, the producer
//! services that feed it, and the dashboard that reads from it.
//!
//! The HTTP client lives behind the `client` feature.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;

/// Header carrying the shared access key on every `/api/*` request.
pub const ACCESS_KEY_HEADER: &str = "X-Access-Key";
