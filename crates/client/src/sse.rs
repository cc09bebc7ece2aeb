//! SSE Frame Reassembly
//!
//! The chat service frames events as newline-delimited `data: ` lines.
//! Network chunks split those lines at arbitrary byte offsets, including
//! inside multi-byte characters, so the decoder buffers raw bytes and
//! only decodes a line once its terminating newline has arrived. The
//! recovered frame sequence is therefore identical no matter how the
//! input was chunked.

const DATA_PREFIX: &str = "data: ";

/// Incremental decoder from byte chunks to complete frame payloads.
///
/// Lines without the `data: ` prefix (blank separators, comments) are
/// filtered out silently. A partial trailing line is held back until the
/// next chunk completes it; whatever is still buffered when the stream
/// ends cannot be a complete frame and is discarded.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: Vec<u8>,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the payloads of every frame completed by
    /// it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=newline).collect();
            let decoded = String::from_utf8_lossy(&line_bytes[..newline]);
            let line = decoded.strip_suffix('\r').unwrap_or(&decoded);
            if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
                frames.push(payload.to_string());
            }
        }
        frames
    }

    /// Drain the buffered partial line, if any, for end-of-stream
    /// logging. The remainder is never a frame.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Some(rest)
    }
}
