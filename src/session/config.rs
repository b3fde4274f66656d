//! Session configuration

use std::time::Duration;

use crate::protocol::constants::{DEFAULT_KEEP_ALIVE_SECS, DEFAULT_RETRY_MS};

/// Per-subscriber session options
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between keep-alive comment frames
    pub keep_alive_interval: Duration,

    /// Reconnect delay announced to the client in the preamble
    pub retry: Duration,

    /// Maximum time a single frame write (including flush) may take
    pub write_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keep_alive_interval: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
            retry: Duration::from_millis(DEFAULT_RETRY_MS),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl SessionConfig {
    /// Set keep-alive interval
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        // tokio::time::interval panics on a zero period
        self.keep_alive_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the reconnect delay sent in the preamble
    pub fn retry(mut self, retry: Duration) -> Self {
        self.retry = retry;
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}
