//! Subscriber-facing transports
//!
//! A session writes frames through an [`EventSink`] and learns about the
//! client going away through [`EventSink::closed`]. Two sinks ship with the
//! crate:
//!
//! - [`ChannelSink`] feeds a streaming HTTP response body. The HTTP stack
//!   drops the body when the connection ends, which is the disconnect signal.
//! - [`WriterSink`] writes to any `AsyncWrite`. It has no separate disconnect
//!   signal; a dead peer surfaces as a failed write (keep-alives force one).

use std::future::Future;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Transport a session writes SSE frames to
pub trait EventSink: Send {
    /// Write one complete frame
    fn write(&mut self, frame: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Push buffered frames to the client
    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Resolves once the client is known to be gone
    fn closed(&self) -> impl Future<Output = ()> + Send;
}

/// Sink backed by a bounded channel drained by an HTTP response body
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    /// Create a sink and the receiver that feeds the response body.
    ///
    /// `buffer` is how many frames may sit between the session and the
    /// HTTP stack (minimum 1).
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    async fn write(&mut self, frame: Bytes) -> Result<()> {
        self.tx.send(frame).await.map_err(|_| Error::Disconnected)
    }

    async fn flush(&mut self) -> Result<()> {
        // Every frame is its own body chunk; hyper flushes as it goes
        if self.tx.is_closed() {
            return Err(Error::Disconnected);
        }
        Ok(())
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Sink writing frames straight to an async writer
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W> EventSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, frame: Bytes) -> Result<()> {
        self.writer.write_all(&frame).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    fn closed(&self) -> impl Future<Output = ()> + Send {
        // Does not borrow self, so W need not be Sync
        std::future::pending()
    }
}
