//! Error types for stream consumption
//!
//! Every variant is terminal for the stream it came from; this layer never
//! retries and never commits partial preview text.

/// Stream consumption error
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Connection failed or dropped mid-stream
    #[error("transport error: {0}")]
    Transport(String),

    /// A `data:` payload was not valid JSON
    #[error("invalid event payload {payload:?}: {source}")]
    Protocol {
        /// Raw payload text
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON whose shape does not fit its event
    #[error("unexpected {event} payload: {reason}")]
    Payload { event: String, reason: String },

    /// Explicit `error` event from the server
    #[error("{detail}")]
    ServerReported { detail: String },

    /// Transport ended before `final` or `error`
    #[error("stream ended without completion")]
    Incomplete,

    /// Consumer stopped pulling and released the transport
    #[error("stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// Reported by the server rather than detected locally
    #[inline]
    #[must_use]
    pub fn is_server_reported(&self) -> bool {
        matches!(self, Self::ServerReported { .. })
    }

    /// Wire grammar or payload shape was violated
    #[inline]
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::Payload { .. })
    }
}
