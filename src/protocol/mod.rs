//! Server-Sent-Events wire protocol
//!
//! Subscribers receive a plain text event stream. Only three kinds of frame
//! are ever written:
//!
//! ```text
//! retry: 1000\n\n          preamble, once per connection
//! : keep-alive\n\n         comment frame, every keep-alive interval
//! data: <base64>\n\n       one per delivered chunk
//! ```
//!
//! Chunk bytes are base64 encoded so that binary audio survives a text
//! protocol untouched.

pub mod constants;
pub mod sse;

pub use sse::{data_frame, keep_alive_frame, preamble};
