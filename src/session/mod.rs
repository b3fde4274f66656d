//! Subscriber sessions
//!
//! A [`StreamSession`] owns one subscriber connection: it registers with the
//! [`SubscriberRegistry`](crate::registry::SubscriberRegistry), turns chunks
//! into SSE frames on an [`EventSink`], keeps the connection alive, and
//! unregisters when the connection ends for any reason.

pub mod config;
pub mod guard;
pub mod sink;
pub mod state;
pub mod stream;

pub use config::SessionConfig;
pub use guard::Registration;
pub use sink::{ChannelSink, EventSink, WriterSink};
pub use state::{SessionExit, SessionPhase, SessionState};
pub use stream::{SessionOutcome, StreamSession};
