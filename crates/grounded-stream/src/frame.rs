//! Event-stream frame decoder
//!
//! Grammar:
//! - records are separated by a blank line; CRLF is normalized to LF first
//! - `event: <name>` sets the event name (default `message`)
//! - `data: <json>` sets the payload; the last `data:` line of a record wins
//! - a record without a non-empty `data:` line is dropped
//!
//! Chunk boundaries are arbitrary: bytes are decoded as streaming UTF-8 and
//! an unterminated record stays buffered until the next chunk completes it.

use crate::error::StreamError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name used when a record has no `event:` line
pub const DEFAULT_EVENT: &str = "message";

const EVENT_PREFIX: &str = "event: ";
const DATA_PREFIX: &str = "data: ";
const RECORD_SEPARATOR: &str = "\n\n";

/// One decoded record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseFrame {
    pub event: String,
    pub data: Value,
}

impl SseFrame {
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Render in wire form, including the terminating blank line
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{EVENT_PREFIX}{}\n{DATA_PREFIX}{}\n\n", self.event, self.data)
    }
}

/// Incremental decoder: feed chunks, pull frames
///
/// Each fed byte is normalized once and scanned for a separator once, so a
/// record arriving in many small chunks costs time linear in its length.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Undecoded tail of a multi-byte UTF-8 sequence
    pending: Vec<u8>,
    /// Chunk ended in `\r`; held until the next byte shows whether it starts CRLF
    held_cr: bool,
    /// Normalized text; `text[consumed..]` is not yet returned as a record
    text: String,
    consumed: usize,
    /// No separator starts before this offset
    scan_from: usize,
}

impl FrameDecoder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transport chunk
    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut decoded = String::with_capacity(self.pending.len() + 1);
        if std::mem::take(&mut self.held_cr) {
            decoded.push('\r');
        }

        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    decoded.push_str(
                        std::str::from_utf8(&self.pending[start..valid_end]).unwrap_or_default(),
                    );
                    match e.error_len() {
                        Some(len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);

        if decoded.ends_with('\r') {
            decoded.pop();
            self.held_cr = true;
        }
        if decoded.contains('\r') {
            decoded = decoded.replace("\r\n", "\n");
        }
        self.text.push_str(&decoded);
    }

    /// Convenience for text transports
    #[inline]
    pub fn feed_str(&mut self, chunk: &str) {
        self.feed(chunk.as_bytes());
    }

    /// Next complete frame, if one is buffered
    ///
    /// Records without data are skipped. A payload that is not valid JSON
    /// yields `Err(StreamError::Protocol)`.
    pub fn next_frame(&mut self) -> Option<Result<SseFrame, StreamError>> {
        loop {
            let from = self.scan_from.max(self.consumed);
            let Some(offset) = self.text[from..].find(RECORD_SEPARATOR) else {
                // A trailing newline may open the next separator
                self.scan_from = if self.text.ends_with('\n') {
                    self.text.len() - 1
                } else {
                    self.text.len()
                };
                self.compact();
                return None;
            };
            let end = from + offset;
            let frame = parse_record(&self.text[self.consumed..end]);
            self.consumed = end + RECORD_SEPARATOR.len();
            self.scan_from = self.consumed;
            if frame.is_some() {
                return frame;
            }
        }
    }

    /// Unterminated text currently buffered
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.text[self.consumed..]
    }

    /// Drop whatever is buffered; returns how many bytes were discarded.
    ///
    /// Called at end of transport: a partial record is never parsed.
    pub fn discard(&mut self) -> usize {
        let discarded = self.buffered().len() + self.pending.len() + usize::from(self.held_cr);
        self.text.clear();
        self.pending.clear();
        self.held_cr = false;
        self.consumed = 0;
        self.scan_from = 0;
        discarded
    }

    fn compact(&mut self) {
        if self.consumed > 0 {
            self.text.drain(..self.consumed);
            self.scan_from = self.scan_from.saturating_sub(self.consumed);
            self.consumed = 0;
        }
    }
}

fn parse_record(record: &str) -> Option<Result<SseFrame, StreamError>> {
    let mut event = DEFAULT_EVENT;
    let mut data = "";

    for line in record.trim().split('\n') {
        if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
            event = name;
        } else if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
            data = payload;
        }
    }

    if data.is_empty() {
        tracing::debug!(event, "Dropping record without data");
        return None;
    }

    Some(
        serde_json::from_str(data)
            .map(|value| SseFrame::new(event, value))
            .map_err(|source| StreamError::Protocol {
                payload: data.to_string(),
                source,
            }),
    )
}

/// Decode a complete body in one pass (test and replay helper)
pub fn decode_all(body: &[u8]) -> Result<Vec<SseFrame>, StreamError> {
    let mut decoder = FrameDecoder::new();
    decoder.feed(body);
    let mut frames = Vec::new();
    while let Some(frame) = decoder.next_frame() {
        frames.push(frame?);
    }
    Ok(frames)
}
