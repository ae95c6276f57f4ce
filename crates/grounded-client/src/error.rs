//! Client error types

use grounded_message::MessageError;
use grounded_stream::StreamError;

/// Client error
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Event stream failed or ended early
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Request rejected, invalid, or not delivered
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Configuration could not be loaded or is out of range
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Server answered with this HTTP status
    #[inline]
    #[must_use]
    pub fn is_rejected_with(&self, status: u16) -> bool {
        matches!(self, Self::Message(e) if e.is_rejected_with(status))
    }

    /// Caller asked for something the lifecycle forbids
    #[inline]
    #[must_use]
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::Message(e) if e.is_invalid_operation())
    }
}

pub(crate) fn transport(e: &reqwest::Error) -> MessageError {
    MessageError::Transport(e.to_string())
}
