//! Error types for message lifecycle operations
//!
//! Covers:
//! - Operations rejected by lifecycle rules (finalized, empty input)
//! - Unknown message ids
//! - Grounding collaborator failures
//! - Rejections and undecodable bodies from a remote store

use crate::types::MessageId;

/// Message lifecycle error
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Message id is unknown to the store
    #[error("message not found: {0}")]
    NotFound(MessageId),

    /// Content mutation attempted on a finalized message
    #[error("cannot modify finalized message {0}")]
    Finalized(MessageId),

    /// Instruction or text was empty after trimming
    #[error("{field} must not be empty")]
    EmptyInput { field: &'static str },

    /// Status outside `draft` / `finalized`
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// Version history violates the append-only contract
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Grounding collaborator could not produce claims
    #[error("grounding failed: {0}")]
    Grounding(String),

    /// Remote store answered with a non-success status
    #[error("API {status}: {body}")]
    RequestRejected { status: u16, body: String },

    /// Remote store answered with a body that does not decode.
    ///
    /// Includes histories rejected by the append-only checks.
    #[error("undecodable response: {0}")]
    Decode(String),

    /// Remote store could not be reached
    #[error("transport error: {0}")]
    Transport(String),
}

impl MessageError {
    /// Rejected by lifecycle rules rather than by infrastructure
    #[inline]
    #[must_use]
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            Self::Finalized(_) | Self::EmptyInput { .. } | Self::InvalidStatus(_)
        )
    }

    /// Remote rejection carrying the given HTTP status
    #[inline]
    #[must_use]
    pub fn is_rejected_with(&self, code: u16) -> bool {
        matches!(self, Self::RequestRejected { status, .. } if *status == code)
    }

    /// Nothing in this layer retries; kept for callers that impose their own policy.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
