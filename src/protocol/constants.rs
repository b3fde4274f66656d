//! SSE protocol constants

/// MIME type of an SSE response body
pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";

/// `Cache-Control` value for streaming responses
pub const CACHE_CONTROL_NO_CACHE: &str = "no-cache";

/// `Connection` value for streaming responses
pub const CONNECTION_KEEP_ALIVE: &str = "keep-alive";

/// `Access-Control-Allow-Origin` value, any origin may subscribe
pub const ALLOW_ANY_ORIGIN: &str = "*";

/// Reconnect delay announced in the preamble (milliseconds)
pub const DEFAULT_RETRY_MS: u64 = 1000;

/// Interval between keep-alive comment frames (seconds)
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

/// Keep-alive comment frame
pub const KEEP_ALIVE_FRAME: &[u8] = b": keep-alive\n\n";

/// Field prefix of a data frame
pub const DATA_PREFIX: &[u8] = b"data: ";

/// Field prefix of the reconnect directive
pub const RETRY_PREFIX: &[u8] = b"retry: ";

/// Blank line terminating every event
pub const EVENT_TERMINATOR: &[u8] = b"\n\n";
