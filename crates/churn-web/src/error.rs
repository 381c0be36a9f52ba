//! Error types for churn-web.

use std::net::SocketAddr;

/// Errors from starting or running the predictor server.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Returned when the listening socket cannot be bound.
    #[error("cannot bind {addr}")]
    Bind {
        /// Address that was attempted.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the server stops with an I/O error.
    #[error("server error")]
    Serve {
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
