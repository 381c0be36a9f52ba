//! Predictor server configuration.

use std::net::{Ipv4Addr, SocketAddr};

/// Configuration for the predictor server.
///
/// # Defaults
///
/// | Parameter | Default            |
/// |-----------|--------------------|
/// | `addr`    | `127.0.0.1:8501`   |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    addr: SocketAddr,
}

impl ServerConfig {
    /// Create a configuration with the default address.
    #[must_use]
    pub fn new() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8501)),
        }
    }

    /// Set the listening address.
    #[must_use]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Return the listening address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
