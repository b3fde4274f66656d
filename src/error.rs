//! Error types
//!
//! Errors that can leave the crate. Per-subscriber failures are absorbed by
//! the session that hit them and only show up in its outcome.

use std::time::Duration;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for server and session operations
#[derive(Debug)]
pub enum Error {
    /// Underlying I/O failure (bind, accept, sink write/flush)
    Io(std::io::Error),
    /// A sink write did not complete within the configured timeout
    WriteTimeout(Duration),
    /// The peer behind a sink has gone away
    Disconnected,
    /// Subscriber refused because the connection limit is reached
    ConnectionLimit,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::WriteTimeout(timeout) => {
                write!(f, "Write timed out after {}ms", timeout.as_millis())
            }
            Error::Disconnected => write!(f, "Client disconnected"),
            Error::ConnectionLimit => write!(f, "Connection limit reached"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl Error {
    /// Whether the error means the peer is gone rather than a local fault
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Disconnected => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
