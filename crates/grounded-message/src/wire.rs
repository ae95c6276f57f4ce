//! Request and response bodies exchanged with the message service

use crate::error::MessageError;
use crate::lifecycle::require_text;
use crate::types::{Claim, MessageId, MessageStatus, ReferenceId};
use serde::{Deserialize, Serialize};

/// Default retrieval depth used by refine when the caller gives none
pub const DEFAULT_TOP_K: u32 = 5;

/// Warning returned when retrieval finds nothing to ground against
pub const INSUFFICIENT_EVIDENCE: &str =
    "Insufficient evidence: no relevant chunks found for the given references.";

/// Body that opens a generation stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub reference_ids: Vec<ReferenceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl GenerateRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>, reference_ids: Vec<ReferenceId>) -> Self {
        Self {
            prompt: prompt.into(),
            reference_ids,
            top_k: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Reject an empty prompt and normalize surrounding whitespace
    pub fn validated(mut self) -> Result<Self, MessageError> {
        self.prompt = require_text("prompt", &self.prompt)?.to_string();
        Ok(self)
    }
}

/// Terminal payload of a generation
///
/// `message_id` is `None` when nothing was persisted; the text and claims
/// are still valid for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub message_id: Option<MessageId>,
    pub message_text: String,
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl GenerationResult {
    /// Result for a generation that found no evidence
    #[must_use]
    pub fn insufficient_evidence() -> Self {
        Self {
            message_id: None,
            message_text: String::new(),
            claims: Vec::new(),
            warnings: vec![INSUFFICIENT_EVIDENCE.to_string()],
        }
    }

    #[inline]
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.message_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineRequest {
    pub instruction: String,
    #[serde(default)]
    pub reference_ids: Vec<ReferenceId>,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

impl RefineRequest {
    #[must_use]
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            reference_ids: Vec::new(),
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_references(mut self, reference_ids: Vec<ReferenceId>) -> Self {
        self.reference_ids = reference_ids;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn validated(mut self) -> Result<Self, MessageError> {
        self.instruction = require_text("instruction", &self.instruction)?.to_string();
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineResponse {
    pub message_id: MessageId,
    pub version_number: u32,
    pub message_text: String,
    pub claims: Vec<Claim>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub message_text: String,
}

impl EditRequest {
    #[must_use]
    pub fn new(message_text: impl Into<String>) -> Self {
        Self {
            message_text: message_text.into(),
        }
    }

    /// Emptiness is judged on the trimmed text; the stored text is kept as given.
    pub fn validated(self) -> Result<Self, MessageError> {
        require_text("message_text", &self.message_text)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditResponse {
    pub message_id: MessageId,
    pub version_number: u32,
    pub message_text: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: MessageStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub id: MessageId,
    pub status: MessageStatus,
}

/// Reference document as listed by the reference collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub id: ReferenceId,
    pub pmid: Option<String>,
    pub title: String,
    pub authors: Option<String>,
    pub source: String,
    pub chunk_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceList {
    pub references: Vec<ReferenceSummary>,
}
