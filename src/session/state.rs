//! Session state machine
//!
//! Tracks one subscriber session from connection to teardown.

use crate::error::Error;
use crate::registry::SubscriberId;
use crate::stats::SessionStats;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Preamble being written, not yet registered
    Init,
    /// Registered and forwarding chunks
    Active,
    /// Tearing down
    Closing,
    /// Unregistered and released
    Closed,
}

/// Why a session ended
#[derive(Debug)]
pub enum SessionExit {
    /// The transport reported the client is gone
    Disconnected,
    /// Writing or flushing a frame failed or timed out
    WriteFailed(Error),
    /// The delivery channel was closed (server shutdown)
    ChannelClosed,
}

impl SessionExit {
    /// Short label for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionExit::Disconnected => "disconnected",
            SessionExit::WriteFailed(_) => "write_failed",
            SessionExit::ChannelClosed => "channel_closed",
        }
    }
}

impl std::fmt::Display for SessionExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionExit::WriteFailed(e) => write!(f, "write failed: {}", e),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Mutable state of a running session
#[derive(Debug)]
pub struct SessionState {
    /// Session ID assigned by the caller
    pub id: u64,

    /// Registry identity, set once registered
    pub subscriber_id: Option<SubscriberId>,

    /// Current phase
    pub phase: SessionPhase,

    /// Counters
    pub stats: SessionStats,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64) -> Self {
        Self {
            id,
            subscriber_id: None,
            phase: SessionPhase::Init,
            stats: SessionStats::new(),
        }
    }

    /// Registered with the registry
    pub fn activate(&mut self, subscriber_id: SubscriberId) {
        if self.phase == SessionPhase::Init {
            self.subscriber_id = Some(subscriber_id);
            self.phase = SessionPhase::Active;
        }
    }

    /// Start tearing down
    pub fn close(&mut self) {
        if matches!(self.phase, SessionPhase::Init | SessionPhase::Active) {
            self.phase = SessionPhase::Closing;
        }
    }

    /// Teardown finished
    pub fn finish(&mut self) {
        self.phase = SessionPhase::Closed;
    }
}
