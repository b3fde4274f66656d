//! Subscriber registry implementation
//!
//! The central registry that tracks every connected subscriber and fans
//! chunks out from the producer to their delivery channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::stats::{RegistryMetrics, RegistryStats};

use super::config::RegistryConfig;
use super::handle::{SubscriberId, Subscription};

/// Result of a single `broadcast` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Subscribers whose channel accepted the chunk
    pub delivered: usize,
    /// Subscribers that lost the chunk (channel full or already closed)
    pub dropped: usize,
}

impl BroadcastOutcome {
    /// Number of subscribers the chunk was offered to
    pub fn attempted(&self) -> usize {
        self.delivered + self.dropped
    }
}

/// State behind the registry lock
#[derive(Default)]
struct Subscribers {
    /// Sending half of every registered subscriber's channel
    map: HashMap<SubscriberId, mpsc::Sender<Bytes>>,

    /// Set by `close_all`; later registrations get a closed channel
    closed: bool,
}

/// Registry of live subscribers
///
/// A single mutex guards the map for inserts, removals and the fan-out
/// sweep. The lock is never held across an `.await`: every send made while
/// holding it is a `try_send`, so a stalled subscriber can never stall the
/// producer or anyone else.
pub struct SubscriberRegistry {
    subscribers: Mutex<Subscribers>,

    /// Next subscriber ID to allocate
    next_id: AtomicU64,

    /// Counters
    metrics: RegistryMetrics,

    /// Configuration
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            subscribers: Mutex::new(Subscribers::default()),
            next_id: AtomicU64::new(1),
            metrics: RegistryMetrics::new(),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new subscriber
    ///
    /// Allocates a bounded delivery channel, stores its sending half and
    /// returns the receiving half. The subscriber only sees chunks broadcast
    /// after this call returns; there is no replay.
    ///
    /// Once `close_all` has run the sending half is dropped instead of
    /// stored, so the returned subscription yields `None` straight away.
    pub fn register(&self) -> Subscription {
        let id = SubscriberId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let subscribers = {
            let mut inner = self.subscribers.lock();
            if inner.closed {
                None
            } else {
                inner.map.insert(id, tx);
                Some(inner.map.len())
            }
        };

        let Some(subscribers) = subscribers else {
            tracing::debug!(subscriber_id = %id, "Registration after close, channel closed");
            return Subscription::new(id, rx);
        };
        self.metrics.record_registration();

        tracing::info!(
            subscriber_id = %id,
            subscribers = subscribers,
            "Subscriber registered"
        );

        Subscription::new(id, rx)
    }

    /// Unregister a subscriber
    ///
    /// Removes its entry and drops the sending half, which closes the
    /// channel. Unknown IDs are ignored; that happens after `close_all`.
    pub fn unregister(&self, id: SubscriberId) {
        let (removed, subscribers) = {
            let mut inner = self.subscribers.lock();
            let removed = inner.map.remove(&id);
            (removed, inner.map.len())
        };

        match removed {
            Some(tx) => {
                drop(tx);
                self.metrics.record_unregistrations(1);
                tracing::info!(
                    subscriber_id = %id,
                    subscribers = subscribers,
                    "Subscriber unregistered"
                );
            }
            None => {
                tracing::trace!(subscriber_id = %id, "Unregister of unknown subscriber");
            }
        }
    }

    /// Broadcast a chunk to every registered subscriber
    ///
    /// Never waits. A subscriber whose channel is full loses this chunk and
    /// the sweep moves on. With no subscribers the chunk is discarded.
    pub fn broadcast(&self, data: impl Into<Bytes>) -> BroadcastOutcome {
        let data = data.into();
        let mut outcome = BroadcastOutcome::default();
        let mut lagging = Vec::new();

        {
            let inner = self.subscribers.lock();
            for (id, tx) in inner.map.iter() {
                // Bytes clone is a refcount bump, not a copy
                match tx.try_send(data.clone()) {
                    Ok(()) => outcome.delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        outcome.dropped += 1;
                        lagging.push((*id, false));
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        // Receiver gone; its session guard will remove the entry
                        outcome.dropped += 1;
                        lagging.push((*id, true));
                    }
                }
            }
        }

        self.metrics.record_broadcast(data.len(), outcome.delivered, outcome.dropped);

        for (id, closed) in lagging {
            tracing::debug!(
                subscriber_id = %id,
                bytes = data.len(),
                closed = closed,
                "Chunk dropped for subscriber"
            );
        }

        tracing::trace!(
            bytes = data.len(),
            delivered = outcome.delivered,
            dropped = outcome.dropped,
            "Chunk broadcast"
        );

        outcome
    }

    /// Remove every subscriber, closing all delivery channels
    ///
    /// Sessions observe their channel closing and shut down. The registry
    /// stays closed: any later `register` gets an already closed channel.
    /// Returns how many subscribers were removed.
    pub fn close_all(&self) -> usize {
        let drained = {
            let mut inner = self.subscribers.lock();
            inner.closed = true;
            std::mem::take(&mut inner.map)
        };
        let count = drained.len();
        drop(drained);

        self.metrics.record_unregistrations(count);
        tracing::info!(subscribers = count, "All subscriber channels closed");

        count
    }

    /// Number of currently registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map.len()
    }

    /// Check whether a subscriber is currently registered
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().map.contains_key(&id)
    }

    /// Whether `close_all` has run
    pub fn is_closed(&self) -> bool {
        self.subscribers.lock().closed
    }

    /// Snapshot of registry statistics
    pub fn stats(&self) -> RegistryStats {
        self.metrics.snapshot(self.subscriber_count())
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.subscriber_count())
            .field("closed", &self.is_closed())
            .field("config", &self.config)
            .finish()
    }
}
