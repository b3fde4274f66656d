//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::session::SessionConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Path of the SSE subscribe endpoint
    pub subscribe_path: String,

    /// Path of the chunk publish endpoint
    pub publish_path: String,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_connections: usize,

    /// Largest accepted publish body in bytes
    pub max_chunk_size: usize,

    /// Frames buffered between a session and its response body
    pub body_buffer: usize,

    /// Registry stats logging interval (zero disables it)
    pub stats_interval: Duration,

    /// Per-subscriber session options
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            subscribe_path: "/sse".to_string(),
            publish_path: "/publish".to_string(),
            max_connections: 0, // Unlimited
            max_chunk_size: 1024 * 1024, // 1MB
            body_buffer: 16,
            stats_interval: Duration::from_secs(30),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the subscribe endpoint path
    pub fn subscribe_path(mut self, path: impl Into<String>) -> Self {
        self.subscribe_path = normalize_path(path.into());
        self
    }

    /// Set the publish endpoint path
    pub fn publish_path(mut self, path: impl Into<String>) -> Self {
        self.publish_path = normalize_path(path.into());
        self
    }

    /// Set maximum concurrent subscribers
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the largest accepted publish body
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    /// Set the per-session response body buffer (minimum 1)
    pub fn body_buffer(mut self, frames: usize) -> Self {
        self.body_buffer = frames.max(1);
        self
    }

    /// Set the stats logging interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set session options
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

/// Router paths must be absolute
fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}
