//! Pull cursor over a chunked transport
//!
//! The consumer pulls one frame at a time; the transport is only polled when
//! no complete frame is buffered. Closing drops the transport, which releases
//! the underlying connection.

use crate::error::StreamError;
use crate::frame::{FrameDecoder, SseFrame};
use futures::stream::{self, Stream, StreamExt};

/// Frames decoded lazily from a byte-chunk stream
pub struct EventCursor<S> {
    transport: Option<S>,
    decoder: FrameDecoder,
    chunks_read: usize,
}

impl<S> std::fmt::Debug for EventCursor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCursor")
            .field("open", &self.transport.is_some())
            .field("decoder", &self.decoder)
            .field("chunks_read", &self.chunks_read)
            .finish()
    }
}

impl<S, B> EventCursor<S>
where
    S: Stream<Item = Result<B, StreamError>> + Unpin,
    B: AsRef<[u8]>,
{
    #[must_use]
    pub fn new(transport: S) -> Self {
        Self {
            transport: Some(transport),
            decoder: FrameDecoder::new(),
            chunks_read: 0,
        }
    }

    /// Next decoded frame; `None` once the transport is exhausted or closed.
    ///
    /// A transport or protocol error closes the cursor before it is returned.
    pub async fn next_frame(&mut self) -> Option<Result<SseFrame, StreamError>> {
        loop {
            match self.decoder.next_frame() {
                Some(Ok(frame)) => return Some(Ok(frame)),
                Some(Err(e)) => {
                    self.close();
                    return Some(Err(e));
                }
                None => {}
            }

            let transport = self.transport.as_mut()?;
            match transport.next().await {
                Some(Ok(chunk)) => {
                    self.chunks_read += 1;
                    self.decoder.feed(chunk.as_ref());
                }
                Some(Err(e)) => {
                    tracing::warn!("Transport failed mid-stream: {}", e);
                    self.close();
                    return Some(Err(e));
                }
                None => {
                    let discarded = self.decoder.discard();
                    if discarded > 0 {
                        tracing::debug!(discarded, "Discarding unterminated record at end of stream");
                    }
                    self.transport = None;
                    return None;
                }
            }
        }
    }

    /// Release the transport and drop anything buffered
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            tracing::debug!(chunks_read = self.chunks_read, "Closing event stream");
        }
        self.decoder.discard();
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    #[inline]
    #[must_use]
    pub fn chunks_read(&self) -> usize {
        self.chunks_read
    }

    /// Adapt into a `Stream` of frames
    pub fn into_stream(self) -> impl Stream<Item = Result<SseFrame, StreamError>> {
        stream::unfold(self, |mut cursor| async move {
            cursor.next_frame().await.map(|frame| (frame, cursor))
        })
    }
}
