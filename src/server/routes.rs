//! HTTP endpoints
//!
//! | Method | Path (default) | Description |
//! |--------|----------------|-------------|
//! | GET    | `/sse`         | Subscribe: long-lived `text/event-stream` response |
//! | POST   | `/publish`     | Publish: request body is broadcast as one chunk |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error::{Error, Result};
use crate::protocol::constants::{
    ALLOW_ANY_ORIGIN, CACHE_CONTROL_NO_CACHE, CONNECTION_KEEP_ALIVE, CONTENT_TYPE_EVENT_STREAM,
};
use crate::registry::SubscriberRegistry;
use crate::session::{ChannelSink, SessionConfig, StreamSession};

use super::config::ServerConfig;

/// Shared state passed to every request handler
#[derive(Clone)]
pub(super) struct AppState {
    pub registry: Arc<SubscriberRegistry>,
    pub session: SessionConfig,
    pub body_buffer: usize,
    pub next_session_id: Arc<AtomicU64>,
    pub connection_semaphore: Option<Arc<Semaphore>>,
}

/// Build the router for the subscribe and publish endpoints
pub(super) fn router(config: &ServerConfig, state: AppState) -> Router {
    Router::new()
        .route(&config.subscribe_path, get(subscribe))
        .route(
            &config.publish_path,
            post(publish).layer(DefaultBodyLimit::max(config.max_chunk_size)),
        )
        .with_state(state)
}

/// Start a stream session for the connecting subscriber
async fn subscribe(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Response> {
    // Permit lives as long as the session task
    let permit = match state.connection_semaphore {
        Some(ref sem) => match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer, "Subscriber rejected: limit reached");
                return Err(Error::ConnectionLimit);
            }
        },
        None => None,
    };

    let session_id = state.next_session_id.fetch_add(1, Ordering::Relaxed);
    let (sink, rx) = ChannelSink::new(state.body_buffer);
    let session = StreamSession::new(session_id, Arc::clone(&state.registry), state.session.clone())
        .with_peer(peer);

    tracing::debug!(session_id = session_id, peer = %peer, "New subscriber");

    tokio::spawn(async move {
        let _permit = permit;
        session.run(sink).await;
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<Bytes, Infallible>));

    Ok((
        [
            (header::CONTENT_TYPE, CONTENT_TYPE_EVENT_STREAM),
            (header::CACHE_CONTROL, CACHE_CONTROL_NO_CACHE),
            (header::CONNECTION, CONNECTION_KEEP_ALIVE),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ANY_ORIGIN),
        ],
        body,
    )
        .into_response())
}

/// Broadcast the request body as one chunk
async fn publish(State(state): State<AppState>, chunk: Bytes) -> StatusCode {
    let bytes = chunk.len();
    let outcome = state.registry.broadcast(chunk);

    tracing::trace!(
        bytes = bytes,
        delivered = outcome.delivered,
        dropped = outcome.dropped,
        "Chunk published"
    );

    StatusCode::NO_CONTENT
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::ConnectionLimit => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
