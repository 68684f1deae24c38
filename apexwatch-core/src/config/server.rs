//! Server configuration.

use std::net::SocketAddr;

/// Server configuration with runtime values.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address and port to listen on.
    pub listen: SocketAddr,
    /// Shared key expected in the `X-Access-Key` header.
    pub access_key: String,
}

impl ServerConfig {
    /// Check a presented access key against the configured one.
    ///
    /// Both keys are run through HMAC-SHA256 and the tags are compared in
    /// constant time, so the comparison leaks neither the length of the
    /// configured key nor how long a matching prefix is.
    pub fn verify_access_key(&self, presented: &str) -> bool {
        if self.access_key.is_empty() {
            return false;
        }
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, b"apexwatch-access-key");
        let expected = ring::hmac::sign(&key, self.access_key.as_bytes());
        ring::hmac::verify(&key, presented.as_bytes(), expected.as_ref()).is_ok()
    }
}
