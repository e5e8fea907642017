//! runtime configuration shared by every request handler

use std::net::SocketAddr;
use std::time::Duration;

/// Immutable gateway configuration, built once at startup and shared behind
/// an `Arc`. Nothing in here changes while the server is running.
#[derive(Debug, Clone)]
pub struct ServerContext {
    /// Upstream resolver the gateway forwards every query to
    pub upstream: SocketAddr,
    /// Deadline applied independently to upstream connect, write and read
    pub timeout: Duration,
    /// Log decoded queries and raw answers
    pub verbose: bool,
    /// Port the HTTP listener binds to
    pub http_port: u16,
}

impl Default for ServerContext {
    fn default() -> ServerContext {
        ServerContext {
            upstream: SocketAddr::from(([1, 1, 1, 1], 53)),
            timeout: Duration::from_millis(2500),
            verbose: false,
            http_port: 8080,
        }
    }
}
