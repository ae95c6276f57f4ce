//! Core types for grounded messages
//!
//! Defines the fundamental records of the message lifecycle:
//! - Integer identifiers shared with the persistence collaborator
//! - Claims and their citations
//! - Messages and their immutable versions

use crate::error::MessageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

macro_rules! integer_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw integer value
            #[inline]
            #[must_use]
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id!(
    /// Message identifier assigned by the store
    MessageId
);
integer_id!(
    /// Version row identifier (distinct from the per-message version number)
    VersionId
);
integer_id!(
    /// Externally-owned reference document
    ReferenceId
);
integer_id!(
    /// Sub-chunk of a reference document
    ChunkId
);

/// Pointer into an external reference chunk.
///
/// Referential integrity is the grounding collaborator's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub reference_id: ReferenceId,
    pub chunk_id: ChunkId,
}

impl Citation {
    #[inline]
    #[must_use]
    pub fn new(reference_id: impl Into<ReferenceId>, chunk_id: impl Into<ChunkId>) -> Self {
        Self {
            reference_id: reference_id.into(),
            chunk_id: chunk_id.into(),
        }
    }
}

/// Grounding verdict for a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// Grounded in at least one cited chunk
    Supported,
    /// Rejected by grounding
    Dropped,
}

/// Atomic assertion extracted from generated text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub status: ClaimStatus,
    /// Why grounding rejected the claim; only meaningful when dropped
    #[serde(default)]
    pub warning: Option<String>,
}

impl Claim {
    /// Create a supported claim
    #[inline]
    #[must_use]
    pub fn supported(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            text: text.into(),
            citations,
            status: ClaimStatus::Supported,
            warning: None,
        }
    }

    /// Create a dropped claim carrying the grounding warning
    #[inline]
    #[must_use]
    pub fn dropped(text: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
            status: ClaimStatus::Dropped,
            warning: Some(warning.into()),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.status == ClaimStatus::Supported
    }

    /// Warning line reported to the caller for a dropped claim
    #[must_use]
    pub fn drop_warning(&self) -> String {
        format!(
            "Dropped claim: '{}' - {}",
            self.text,
            self.warning.as_deref().unwrap_or("not grounded")
        )
    }
}

/// Split a claim set into `(supported, dropped)`, preserving order.
#[must_use]
pub fn partition_claims(claims: Vec<Claim>) -> (Vec<Claim>, Vec<Claim>) {
    claims.into_iter().partition(Claim::is_supported)
}

/// Message text assembled from supported claims
#[must_use]
pub fn join_claim_text(claims: &[Claim]) -> String {
    claims
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lifecycle status of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Open for refine and edit
    #[default]
    Draft,
    /// Content locked; only the status may change
    Finalized,
}

impl MessageStatus {
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Draft => "draft",
            MessageStatus::Finalized => "finalized",
        }
    }

    /// The other status
    #[inline]
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            MessageStatus::Draft => MessageStatus::Finalized,
            MessageStatus::Finalized => MessageStatus::Draft,
        }
    }
}

impl FromStr for MessageStatus {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(MessageStatus::Draft),
            "finalized" => Ok(MessageStatus::Finalized),
            other => Err(MessageError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which operation produced a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSource {
    Generated,
    Refined,
    Edited,
}

/// Immutable snapshot of a message's text and claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageVersion {
    pub id: VersionId,
    pub version_number: u32,
    pub source: VersionSource,
    pub created_at: DateTime<Utc>,
    pub prompt_or_instruction: String,
    pub message_text: String,
    /// Supported claims only
    pub claims: Vec<Claim>,
    /// Dropped claims only
    pub dropped_claims: Vec<Claim>,
}

impl MessageVersion {
    /// Citations of every supported claim, in claim order
    pub fn citations(&self) -> impl Iterator<Item = &Citation> {
        self.claims.iter().flat_map(|c| c.citations.iter())
    }

    /// Distinct references cited by this version, in first-seen order
    #[must_use]
    pub fn cited_references(&self) -> Vec<ReferenceId> {
        let mut seen = Vec::new();
        for citation in self.citations() {
            if !seen.contains(&citation.reference_id) {
                seen.push(citation.reference_id);
            }
        }
        seen
    }
}

/// Versioned message record
///
/// # Invariants
/// - `versions` is non-empty
/// - `versions[i].version_number == i + 1`
/// - no version is appended while finalized
///
/// Fields are private: versions can only be appended through the
/// store, and deserialized records are re-validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MessageRecord")]
pub struct Message {
    pub(crate) id: MessageId,
    pub(crate) status: MessageStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) versions: Vec<MessageVersion>,
}

impl Message {
    #[inline]
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> MessageStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.status == MessageStatus::Finalized
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// All versions, ascending by version number
    #[inline]
    #[must_use]
    pub fn versions(&self) -> &[MessageVersion] {
        &self.versions
    }

    /// Highest-numbered version
    #[must_use]
    pub fn latest_version(&self) -> &MessageVersion {
        // Construction and deserialization both reject an empty history.
        &self.versions[self.versions.len() - 1]
    }

    /// Version by its 1-based number
    #[must_use]
    pub fn version(&self, number: u32) -> Option<&MessageVersion> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.versions.get(index)
    }

    /// Summary row for list views
    #[must_use]
    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            id: self.id,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            latest_version: self.latest_version().clone(),
        }
    }
}

/// Unvalidated wire form of [`Message`]
#[derive(Debug, Deserialize)]
struct MessageRecord {
    id: MessageId,
    status: MessageStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    versions: Vec<MessageVersion>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = MessageError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        crate::version::validate_versions(&record.versions)?;
        Ok(Self {
            id: record.id,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            versions: record.versions,
        })
    }
}

/// List-view row: a message with only its latest version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: MessageId,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub latest_version: MessageVersion,
}
