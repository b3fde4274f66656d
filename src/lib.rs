//! # chunkcast
//!
//! Real-time broadcast hub: one producer pushes binary chunks (audio frames),
//! and every connected subscriber receives each chunk produced after it
//! joined, as base64 `data:` events on a Server-Sent-Events stream.
//!
//! ```text
//!  producer ──broadcast()──► SubscriberRegistry ──try_send──► StreamSession ──SSE──► client
//!                                                  ├────────► StreamSession ──SSE──► client
//!                                                  └────────► StreamSession ──SSE──► client
//! ```
//!
//! - [`SubscriberRegistry`] fans chunks out without ever blocking: a
//!   subscriber whose channel is full loses that chunk, nobody else notices.
//! - [`StreamSession`] drives one subscriber: preamble, keep-alives, data
//!   frames, and unregistration on every exit path.
//! - [`SseServer`] puts both behind `GET /sse` and `POST /publish`.
//!
//! # Example
//!
//! ```no_run
//! use chunkcast::{ServerConfig, SseServer};
//!
//! # async fn example() -> chunkcast::Result<()> {
//! let server = SseServer::new(ServerConfig::default());
//! let registry = server.registry().clone();
//!
//! tokio::spawn(async move {
//!     loop {
//!         registry.broadcast(vec![0u8; 320]);
//!         tokio::time::sleep(std::time::Duration::from_millis(20)).await;
//!     }
//! });
//!
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use registry::{
    BroadcastOutcome, RegistryConfig, SubscriberId, SubscriberRegistry, Subscription,
};
pub use server::{ServerConfig, SseServer};
pub use session::{ChannelSink, EventSink, SessionConfig, SessionExit, StreamSession, WriterSink};
pub use stats::{RegistryStats, SessionStats};
