//! HTTP server surface
//!
//! Exposes the registry over HTTP: subscribers hold a streaming
//! `text/event-stream` response open, and a producer posts raw chunks to be
//! broadcast.

pub mod config;
pub mod listener;
mod routes;

pub use config::ServerConfig;
pub use listener::SseServer;
