//! Subscriber registry for chunk fan-out
//!
//! The registry owns the sending half of one bounded channel per connected
//! subscriber. The producer calls `broadcast`, which offers the chunk to
//! every channel with `try_send`; a channel that is full simply loses that
//! chunk.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<SubscriberRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ Mutex<{ closed, HashMap<     │
//!                  │   SubscriberId, Sender> }>   │
//!                  └──────────────┬───────────────┘
//!                                 │ try_send (drop on full)
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!   [StreamSession]         [StreamSession]         [StreamSession]
//!   subscription.recv()     subscription.recv()     subscription.recv()
//!         │                       │                       │
//!         └─► data: <base64> ─► HTTP body ─► client
//! ```
//!
//! # Zero-Copy Design
//!
//! Chunks are `bytes::Bytes`, so every subscriber shares the producer's
//! allocation. Fanning out to N subscribers costs N refcount increments.

pub mod config;
pub mod handle;
pub mod store;

pub use config::RegistryConfig;
pub use handle::{SubscriberId, Subscription};
pub use store::{BroadcastOutcome, SubscriberRegistry};
