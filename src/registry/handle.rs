//! Subscriber identity and delivery handle

use bytes::Bytes;
use tokio::sync::mpsc;

/// Opaque, process-unique identifier of a registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(super) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Consumer side of a subscriber's delivery channel
///
/// Returned by [`SubscriberRegistry::register`](super::SubscriberRegistry::register).
/// The registry keeps only the sending half; once the subscriber is
/// unregistered (or the registry is closed) `recv` drains whatever is left
/// and then yields `None`.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Bytes>,
}

impl Subscription {
    pub(super) fn new(id: SubscriberId, rx: mpsc::Receiver<Bytes>) -> Self {
        Self { id, rx }
    }

    /// Identity to pass to `unregister`
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next chunk. `None` once the channel is closed and empty.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Take a chunk if one is ready, without waiting
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    /// Whether the registry side has gone away and nothing is buffered
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }
}
