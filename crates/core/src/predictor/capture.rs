//! Bounded capture of a child process output stream.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Accumulates bytes up to a fixed cap and silently drops the rest.
///
/// Only the first `cap` bytes are kept; this is not a sliding window.
#[derive(Debug)]
pub struct CappedBuffer {
    cap: usize,
    bytes: Vec<u8>,
    seen: usize,
}

impl CappedBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            bytes: Vec::new(),
            seen: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.seen = self.seen.saturating_add(chunk.len());
        let room = self.cap.saturating_sub(self.bytes.len());
        let take = room.min(chunk.len());
        self.bytes.extend_from_slice(&chunk[..take]);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Total bytes offered, including the dropped ones.
    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn truncated(&self) -> bool {
        self.seen > self.bytes.len()
    }

    /// Lossy UTF-8 view; a multi-byte character cut by the cap becomes U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Reads `reader` to EOF into a [`CappedBuffer`].
///
/// Read errors end the capture early; whatever was read so far is kept.
pub async fn drain<R>(mut reader: R, cap: usize) -> CappedBuffer
where
    R: AsyncRead + Unpin,
{
    let mut buffer = CappedBuffer::new(cap);
    let mut chunk = [0u8; 8 * 1024];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.push(&chunk[..n]),
            Err(e) => {
                tracing::debug!("predictor stream read failed: {}", e);
                break;
            }
        }
    }

    buffer
}
