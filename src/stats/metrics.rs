//! Statistics for the registry and subscriber sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters updated by the registry
///
/// All counters are monotonically increasing and updated with relaxed
/// ordering; readers take a [`RegistryStats`] snapshot.
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    chunks_broadcast: AtomicU64,
    bytes_broadcast: AtomicU64,
    deliveries: AtomicU64,
    drops: AtomicU64,
    registrations: AtomicU64,
    unregistrations: AtomicU64,
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one broadcast call and its per-subscriber results
    pub fn record_broadcast(&self, bytes: usize, delivered: usize, dropped: usize) {
        self.chunks_broadcast.fetch_add(1, Ordering::Relaxed);
        self.bytes_broadcast.fetch_add(bytes as u64, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.drops.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unregistrations(&self, count: usize) {
        self.unregistrations.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self, active_subscribers: usize) -> RegistryStats {
        RegistryStats {
            active_subscribers,
            chunks_broadcast: self.chunks_broadcast.load(Ordering::Relaxed),
            bytes_broadcast: self.bytes_broadcast.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            unregistrations: self.unregistrations.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of registry-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Subscribers registered at snapshot time
    pub active_subscribers: usize,
    /// Total `broadcast` calls
    pub chunks_broadcast: u64,
    /// Total payload bytes passed to `broadcast`
    pub bytes_broadcast: u64,
    /// Chunks placed into a subscriber channel
    pub deliveries: u64,
    /// Chunks dropped because a subscriber channel was full or closed
    pub drops: u64,
    /// Total subscribers ever registered
    pub registrations: u64,
    /// Total subscribers removed (unregistered or closed at shutdown)
    pub unregistrations: u64,
}

impl RegistryStats {
    /// Fraction of attempted deliveries that were dropped (0.0 - 1.0)
    pub fn drop_ratio(&self) -> f64 {
        let attempts = self.deliveries + self.drops;
        if attempts > 0 {
            self.drops as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

/// Per-session statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// When the session started
    pub started_at: Instant,
    /// Data frames written
    pub frames_sent: u64,
    /// Empty chunks skipped
    pub empty_chunks: u64,
    /// Keep-alive frames written
    pub keep_alives_sent: u64,
    /// Total bytes written to the wire, preamble included
    pub bytes_sent: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_sent: 0,
            empty_chunks: 0,
            keep_alives_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Time since the session started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Outgoing bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
