//! Scoped registry membership

use std::sync::Arc;

use crate::registry::{SubscriberId, SubscriberRegistry, Subscription};

/// Keeps a subscriber registered for as long as it is alive
///
/// Dropping the guard unregisters the subscriber, closing its delivery
/// channel. Because this happens in `Drop`, it runs on every way out of a
/// session: normal return, early return and unwinding panic alike.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<SubscriberRegistry>,
    id: SubscriberId,
}

impl Registration {
    /// Register with the registry, returning the guard and the receiving side
    pub fn register(registry: &Arc<SubscriberRegistry>) -> (Self, Subscription) {
        let subscription = registry.register();
        let guard = Self {
            registry: Arc::clone(registry),
            id: subscription.id(),
        };
        (guard, subscription)
    }

    /// Registered identity
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
