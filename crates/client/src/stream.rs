//! Chat Event Stream
//!
//! Pulls byte chunks off a live chat response, reassembles frames, and
//! parses them into [`ChatStreamEvent`]s. A single malformed frame is a
//! recoverable condition: it is logged and skipped, and the stream keeps
//! going — one bad event from one agent must not kill the whole answer.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use supplysense_core::ChatStreamEvent;

use crate::error::{network_error, ChatResult};
use crate::sse::SseFrameDecoder;

type ByteStream = Pin<Box<dyn Stream<Item = ChatResult<Bytes>> + Send>>;

/// Lazy sequence of parsed events from one chat response body.
pub struct EventStream {
    inner: ByteStream,
    decoder: SseFrameDecoder,
    pending: VecDeque<ChatStreamEvent>,
    done: bool,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("pending", &self.pending)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl EventStream {
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        Self::from_byte_stream(response.bytes_stream().map(|item| item.map_err(network_error)))
    }

    pub(crate) fn from_byte_stream(
        stream: impl Stream<Item = ChatResult<Bytes>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(stream),
            decoder: SseFrameDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Next event, in strict arrival order. `Ok(None)` means the stream
    /// ended; transport failures surface as errors.
    pub async fn next_event(&mut self) -> ChatResult<Option<ChatStreamEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.done {
                return Ok(None);
            }
            match self.inner.next().await {
                Some(Ok(chunk)) => {
                    for frame in self.decoder.push(&chunk) {
                        match serde_json::from_str::<ChatStreamEvent>(&frame) {
                            Ok(event) => self.pending.push_back(event),
                            Err(err) => {
                                tracing::warn!(error = %err, "skipping malformed stream frame");
                            }
                        }
                    }
                }
                Some(Err(err)) => return Err(err),
                None => {
                    self.done = true;
                    if let Some(rest) = self.decoder.take_remainder() {
                        tracing::debug!(bytes = rest.len(), "discarding incomplete trailing line");
                    }
                }
            }
        }
    }
}
