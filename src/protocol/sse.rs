//! SSE frame encoders
//!
//! Each function returns a complete, self-terminated event ready to be
//! written to a subscriber's sink in one call.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};

use super::constants::{DATA_PREFIX, EVENT_TERMINATOR, KEEP_ALIVE_FRAME, RETRY_PREFIX};

/// Build the connection preamble telling the client how long to wait
/// before reconnecting.
pub fn preamble(retry: Duration) -> Bytes {
    let millis = retry.as_millis().to_string();
    let mut buf =
        BytesMut::with_capacity(RETRY_PREFIX.len() + millis.len() + EVENT_TERMINATOR.len());
    buf.put_slice(RETRY_PREFIX);
    buf.put_slice(millis.as_bytes());
    buf.put_slice(EVENT_TERMINATOR);
    buf.freeze()
}

/// Keep-alive comment frame
#[inline]
pub fn keep_alive_frame() -> Bytes {
    Bytes::from_static(KEEP_ALIVE_FRAME)
}

/// Encode a chunk as a `data:` event with a base64 payload.
pub fn data_frame(chunk: &[u8]) -> Bytes {
    let encoded = STANDARD.encode(chunk);
    let mut buf =
        BytesMut::with_capacity(DATA_PREFIX.len() + encoded.len() + EVENT_TERMINATOR.len());
    buf.put_slice(DATA_PREFIX);
    buf.put_slice(encoded.as_bytes());
    buf.put_slice(EVENT_TERMINATOR);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_default_retry() {
        let frame = preamble(Duration::from_millis(1000));
        assert_eq!(&frame[..], b"retry: 1000\n\n");
    }

    #[test]
    fn test_preamble_sub_second() {
        let frame = preamble(Duration::from_millis(250));
        assert_eq!(&frame[..], b"retry: 250\n\n");
    }

    #[test]
    fn test_keep_alive_frame() {
        assert_eq!(&keep_alive_frame()[..], b": keep-alive\n\n");
    }

    #[test]
    fn test_data_frame_text() {
        let frame = data_frame(b"hello");
        assert_eq!(&frame[..], b"data: aGVsbG8=\n\n");
    }

    #[test]
    fn test_data_frame_binary_is_single_line() {
        // Raw newlines and invalid UTF-8 must not leak into the event
        let chunk = [0x00, 0x0A, 0xFF, 0x0D, 0x0A, 0x80];
        let frame = data_frame(&chunk);

        assert_eq!(&frame[..], b"data: AAr/DQqA\n\n");
        let body = &frame[DATA_PREFIX.len()..frame.len() - EVENT_TERMINATOR.len()];
        assert!(!body.contains(&b'\n'));
        assert!(!body.contains(&b'\r'));
        assert_eq!(STANDARD.decode(body).unwrap(), chunk);
    }
}
