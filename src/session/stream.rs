//! Subscriber stream session
//!
//! Drives one subscriber from the preamble to teardown:
//!
//! ```text
//!   Init ──preamble ok──► Active ──disconnect / write error / channel closed──► Closing ──► Closed
//!     │                     ▲  │
//!     │                     └──┘ keep-alive tick, chunk
//!     └──preamble failed──────────────────────────────────────────────────────► Closing
//! ```
//!
//! While active the session waits on three sources at once: the sink's
//! disconnect signal, the keep-alive timer and its delivery channel.
//! Whichever is ready first wins.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{Error, Result};
use crate::protocol::sse;
use crate::registry::{SubscriberId, SubscriberRegistry};
use crate::stats::SessionStats;

use super::config::SessionConfig;
use super::guard::Registration;
use super::sink::EventSink;
use super::state::{SessionExit, SessionState};

/// What woke the session loop
enum SessionEvent {
    Disconnected,
    KeepAlive,
    Chunk(Bytes),
    ChannelClosed,
}

/// Final report of a finished session
#[derive(Debug)]
pub struct SessionOutcome {
    /// Session ID
    pub session_id: u64,
    /// Registry identity, `None` if the session never got past the preamble
    pub subscriber_id: Option<SubscriberId>,
    /// Why the session ended
    pub exit: SessionExit,
    /// Counters at teardown
    pub stats: SessionStats,
}

/// One subscriber's connection lifetime
pub struct StreamSession {
    session_id: u64,
    peer_addr: Option<SocketAddr>,
    registry: Arc<SubscriberRegistry>,
    config: SessionConfig,
}

impl StreamSession {
    /// Create a new session
    pub fn new(session_id: u64, registry: Arc<SubscriberRegistry>, config: SessionConfig) -> Self {
        Self {
            session_id,
            peer_addr: None,
            registry,
            config,
        }
    }

    /// Attach the remote address, for logging
    pub fn with_peer(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    /// Run the session to completion
    ///
    /// Writes the preamble, registers, then forwards chunks and keep-alives
    /// until the client disconnects, a write fails or the delivery channel
    /// closes. The subscriber is unregistered on every exit path.
    pub async fn run<S: EventSink>(self, mut sink: S) -> SessionOutcome {
        let mut state = SessionState::new(self.session_id);

        tracing::debug!(
            session_id = self.session_id,
            peer = ?self.peer_addr,
            "Session starting"
        );

        if let Err(e) = self
            .send(&mut sink, sse::preamble(self.config.retry), &mut state.stats)
            .await
        {
            state.close();
            return self.finish(state, SessionExit::WriteFailed(e));
        }

        let (registration, mut subscription) = Registration::register(&self.registry);
        state.activate(registration.id());

        tracing::info!(
            session_id = self.session_id,
            subscriber_id = %registration.id(),
            peer = ?self.peer_addr,
            "Session active"
        );

        let period = self.config.keep_alive_interval;
        let mut keep_alive = tokio::time::interval_at(Instant::now() + period, period);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            let event = tokio::select! {
                _ = sink.closed() => SessionEvent::Disconnected,
                _ = keep_alive.tick() => SessionEvent::KeepAlive,
                chunk = subscription.recv() => match chunk {
                    Some(chunk) => SessionEvent::Chunk(chunk),
                    None => SessionEvent::ChannelClosed,
                },
            };

            match event {
                SessionEvent::Disconnected => break SessionExit::Disconnected,
                SessionEvent::ChannelClosed => break SessionExit::ChannelClosed,
                SessionEvent::KeepAlive => {
                    if let Err(e) = self
                        .send(&mut sink, sse::keep_alive_frame(), &mut state.stats)
                        .await
                    {
                        break SessionExit::WriteFailed(e);
                    }
                    state.stats.keep_alives_sent += 1;
                    tracing::trace!(session_id = self.session_id, "Keep-alive sent");
                }
                SessionEvent::Chunk(chunk) => {
                    if chunk.is_empty() {
                        state.stats.empty_chunks += 1;
                        continue;
                    }
                    if let Err(e) = self
                        .send(&mut sink, sse::data_frame(&chunk), &mut state.stats)
                        .await
                    {
                        break SessionExit::WriteFailed(e);
                    }
                    state.stats.frames_sent += 1;
                }
            }
        };

        state.close();
        // Unregister first so the registry stops offering chunks, then release the channel
        drop(registration);
        drop(subscription);
        drop(keep_alive);

        self.finish(state, exit)
    }

    /// Write and flush one frame within the write timeout
    async fn send<S: EventSink>(
        &self,
        sink: &mut S,
        frame: Bytes,
        stats: &mut SessionStats,
    ) -> Result<()> {
        let len = frame.len();
        let write = async {
            sink.write(frame).await?;
            sink.flush().await
        };

        match tokio::time::timeout(self.config.write_timeout, write).await {
            Ok(Ok(())) => {
                stats.bytes_sent += len as u64;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::WriteTimeout(self.config.write_timeout)),
        }
    }

    fn finish(&self, mut state: SessionState, exit: SessionExit) -> SessionOutcome {
        state.finish();

        match &exit {
            SessionExit::WriteFailed(e) if !e.is_disconnect() => {
                tracing::warn!(
                    session_id = self.session_id,
                    peer = ?self.peer_addr,
                    error = %e,
                    "Session write failed"
                );
            }
            _ => {}
        }

        tracing::info!(
            session_id = self.session_id,
            subscriber_id = ?state.subscriber_id,
            reason = exit.as_str(),
            frames = state.stats.frames_sent,
            keep_alives = state.stats.keep_alives_sent,
            bytes = state.stats.bytes_sent,
            bitrate = state.stats.bitrate(),
            duration_ms = state.stats.duration().as_millis() as u64,
            "Session closed"
        );

        SessionOutcome {
            session_id: self.session_id,
            subscriber_id: state.subscriber_id,
            exit,
            stats: state.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::registry::RegistryConfig;
    use crate::session::sink::{ChannelSink, WriterSink};

    /// Accepts the first `allowed` writes, then fails with a broken pipe
    struct FailingSink {
        allowed: usize,
        written: Arc<AtomicUsize>,
    }

    impl EventSink for FailingSink {
        async fn write(&mut self, _frame: Bytes) -> Result<()> {
            if self.written.fetch_add(1, Ordering::SeqCst) >= self.allowed {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone").into());
            }
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        async fn closed(&self) {
            std::future::pending::<()>().await
        }
    }

    /// Panics on any write after the preamble
    struct PanickingSink {
        writes: usize,
    }

    impl EventSink for PanickingSink {
        async fn write(&mut self, _frame: Bytes) -> Result<()> {
            self.writes += 1;
            if self.writes > 1 {
                panic!("encoder exploded");
            }
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        async fn closed(&self) {
            std::future::pending::<()>().await
        }
    }

    fn test_session(registry: &Arc<SubscriberRegistry>) -> StreamSession {
        StreamSession::new(1, Arc::clone(registry), SessionConfig::default())
    }

    async fn wait_for_subscribers(registry: &SubscriberRegistry, count: usize) {
        while registry.subscriber_count() != count {
            tokio::task::yield_now().await;
        }
    }

    async fn next_frame(body: &mut mpsc::Receiver<Bytes>) -> Bytes {
        body.recv().await.expect("body closed")
    }

    #[tokio::test(start_paused = true)]
    async fn test_preamble_then_data() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sink, mut body) = ChannelSink::new(8);
        let handle = tokio::spawn(test_session(&registry).run(sink));

        assert_eq!(next_frame(&mut body).await, Bytes::from_static(b"retry: 1000\n\n"));
        wait_for_subscribers(&registry, 1).await;

        registry.broadcast(Bytes::from_static(b"hello"));
        assert_eq!(next_frame(&mut body).await, Bytes::from_static(b"data: aGVsbG8=\n\n"));

        drop(body);
        let outcome = handle.await.unwrap();
        assert!(matches!(outcome.exit, SessionExit::Disconnected));
        assert_eq!(outcome.stats.frames_sent, 1);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_in_preamble() {
        let registry = Arc::new(SubscriberRegistry::new());
        let config = SessionConfig::default().retry(Duration::from_millis(2500));
        let (sink, mut body) = ChannelSink::new(8);
        let _handle = tokio::spawn(StreamSession::new(1, Arc::clone(&registry), config).run(sink));

        assert_eq!(next_frame(&mut body).await, Bytes::from_static(b"retry: 2500\n\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_chunks_skipped() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sink, mut body) = ChannelSink::new(8);
        let handle = tokio::spawn(test_session(&registry).run(sink));

        next_frame(&mut body).await;
        wait_for_subscribers(&registry, 1).await;

        registry.broadcast(Bytes::new());
        registry.broadcast(Bytes::from_static(b"x"));
        assert_eq!(next_frame(&mut body).await, Bytes::from_static(b"data: eA==\n\n"));

        registry.close_all();
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.stats.empty_chunks, 1);
        assert_eq!(outcome.stats.frames_sent, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_after_interval() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sink, mut body) = ChannelSink::new(8);
        let _handle = tokio::spawn(test_session(&registry).run(sink));

        next_frame(&mut body).await;
        let start = Instant::now();

        assert_eq!(next_frame(&mut body).await, Bytes::from_static(b": keep-alive\n\n"));
        assert!(start.elapsed() >= Duration::from_secs(15));

        assert_eq!(next_frame(&mut body).await, Bytes::from_static(b": keep-alive\n\n"));
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_on_disconnect() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sink, mut body) = ChannelSink::new(8);
        let handle = tokio::spawn(test_session(&registry).run(sink));

        next_frame(&mut body).await;
        wait_for_subscribers(&registry, 1).await;
        drop(body);

        let outcome = handle.await.unwrap();
        assert!(matches!(outcome.exit, SessionExit::Disconnected));
        assert!(outcome.subscriber_id.is_some());

        let stats = registry.stats();
        assert_eq!(stats.active_subscribers, 0);
        assert_eq!(stats.registrations, 1);
        assert_eq!(stats.unregistrations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_on_write_error() {
        let registry = Arc::new(SubscriberRegistry::new());
        let written = Arc::new(AtomicUsize::new(0));
        let sink = FailingSink {
            allowed: 1,
            written: Arc::clone(&written),
        };
        let handle = tokio::spawn(test_session(&registry).run(sink));

        wait_for_subscribers(&registry, 1).await;
        registry.broadcast(Bytes::from_static(b"doomed"));

        let outcome = handle.await.unwrap();
        match outcome.exit {
            SessionExit::WriteFailed(e) => assert!(e.is_disconnect()),
            other => panic!("unexpected exit: {:?}", other),
        }
        assert_eq!(written.load(Ordering::SeqCst), 2);
        assert_eq!(registry.subscriber_count(), 0);
        assert_eq!(registry.stats().unregistrations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_surfaces_dead_peer() {
        let registry = Arc::new(SubscriberRegistry::new());
        let sink = FailingSink {
            allowed: 1,
            written: Arc::new(AtomicUsize::new(0)),
        };

        // No data ever arrives; the keep-alive write is what fails
        let outcome = test_session(&registry).run(sink).await;

        assert!(matches!(outcome.exit, SessionExit::WriteFailed(_)));
        assert_eq!(outcome.stats.keep_alives_sent, 0);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_on_channel_closed() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sink, mut body) = ChannelSink::new(8);
        let handle = tokio::spawn(test_session(&registry).run(sink));

        next_frame(&mut body).await;
        wait_for_subscribers(&registry, 1).await;
        registry.close_all();

        let outcome = handle.await.unwrap();
        assert!(matches!(outcome.exit, SessionExit::ChannelClosed));
        // close_all already removed the entry; the guard's unregister is a no-op
        assert_eq!(registry.stats().unregistrations, 1);

        // Body ends once the session drops its sink
        assert!(body.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_started_after_close_all_ends() {
        let registry = Arc::new(SubscriberRegistry::new());
        registry.close_all();

        let (sink, mut body) = ChannelSink::new(8);
        let handle = tokio::spawn(test_session(&registry).run(sink));

        assert_eq!(next_frame(&mut body).await, Bytes::from_static(b"retry: 1000\n\n"));

        let outcome = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("session outlived the closed registry")
            .unwrap();
        assert!(matches!(outcome.exit, SessionExit::ChannelClosed));
        assert!(outcome.subscriber_id.is_some());
        assert_eq!(outcome.stats.keep_alives_sent, 0);
        assert_eq!(registry.subscriber_count(), 0);

        assert!(body.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_on_panic() {
        let registry = Arc::new(SubscriberRegistry::new());
        let handle = tokio::spawn(test_session(&registry).run(PanickingSink { writes: 0 }));

        wait_for_subscribers(&registry, 1).await;
        registry.broadcast(Bytes::from_static(b"boom"));

        let err = handle.await.unwrap_err();
        assert!(err.is_panic());
        assert_eq!(registry.subscriber_count(), 0);
        assert_eq!(registry.stats().unregistrations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preamble_failure_never_registers() {
        let registry = Arc::new(SubscriberRegistry::new());
        let sink = FailingSink {
            allowed: 0,
            written: Arc::new(AtomicUsize::new(0)),
        };

        let outcome = test_session(&registry).run(sink).await;

        assert!(matches!(outcome.exit, SessionExit::WriteFailed(_)));
        assert!(outcome.subscriber_id.is_none());
        assert_eq!(registry.stats().registrations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_body_times_out() {
        let registry = Arc::new(SubscriberRegistry::new());
        let config = SessionConfig::default().write_timeout(Duration::from_secs(1));
        // Room for the preamble only, and nobody reads the body
        let (sink, _body) = ChannelSink::new(1);
        let handle = tokio::spawn(StreamSession::new(1, Arc::clone(&registry), config).run(sink));

        wait_for_subscribers(&registry, 1).await;
        registry.broadcast(Bytes::from_static(b"stuck"));

        let outcome = handle.await.unwrap();
        match outcome.exit {
            SessionExit::WriteFailed(Error::WriteTimeout(t)) => {
                assert_eq!(t, Duration::from_secs(1))
            }
            other => panic!("unexpected exit: {:?}", other),
        }
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_session_does_not_affect_others() {
        let registry = Arc::new(SubscriberRegistry::with_config(
            RegistryConfig::default().channel_capacity(1),
        ));

        // The slow body never gets read past the preamble
        let (slow_sink, _slow_body) = ChannelSink::new(1);
        let (fast_sink, mut fast_body) = ChannelSink::new(16);
        let slow = StreamSession::new(1, Arc::clone(&registry), SessionConfig::default());
        let fast = StreamSession::new(2, Arc::clone(&registry), SessionConfig::default());
        let _slow = tokio::spawn(slow.run(slow_sink));
        let _fast = tokio::spawn(fast.run(fast_sink));

        next_frame(&mut fast_body).await;
        wait_for_subscribers(&registry, 2).await;

        let expected = [
            (&b"a"[..], &b"data: YQ==\n\n"[..]),
            (b"b", b"data: Yg==\n\n"),
            (b"c", b"data: Yw==\n\n"),
        ];
        let mut dropped = 0;
        for (chunk, frame) in expected {
            dropped += registry.broadcast(Bytes::copy_from_slice(chunk)).dropped;
            assert_eq!(&next_frame(&mut fast_body).await[..], frame);
        }

        // Slow session holds "a" in its write and "b" in its channel
        assert_eq!(dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writer_sink_session() {
        use tokio::io::AsyncReadExt;

        let registry = Arc::new(SubscriberRegistry::new());
        let (client, mut server) = tokio::io::duplex(256);
        let handle = tokio::spawn(test_session(&registry).run(WriterSink::new(client)));

        let mut preamble = [0u8; 13];
        server.read_exact(&mut preamble).await.unwrap();
        assert_eq!(&preamble, b"retry: 1000\n\n");

        wait_for_subscribers(&registry, 1).await;
        drop(server);

        // Dead peer is found by the next keep-alive write
        let outcome = handle.await.unwrap();
        assert!(matches!(outcome.exit, SessionExit::WriteFailed(_)));
        assert_eq!(registry.subscriber_count(), 0);
    }
}
