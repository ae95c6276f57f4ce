//! Grounded messages - versioned, append-only records of citation-grounded text
//!
//! A [`Message`] is created by a successful generation (version 1) and grows
//! by one [`MessageVersion`] per refine or edit while it is a draft.
//! Finalizing locks the content; only the status may change afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use grounded_message::{InMemoryMessageStore, GenerateRequest, MessageService, RefineRequest};
//!
//! # async fn example(engine: impl grounded_message::GroundingEngine) -> Result<(), grounded_message::MessageError> {
//! let store = InMemoryMessageStore::new(engine);
//! let result = store.generate(GenerateRequest::new("summarize X", vec![1.into()])).await?;
//!
//! if let Some(id) = result.message_id {
//!     let refined = store.refine(id, RefineRequest::new("make it shorter")).await?;
//!     println!("now at version {}", refined.version_number);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod grounding;
pub mod lifecycle;
pub mod store;
pub mod types;
pub mod version;
pub mod wire;

pub use error::MessageError;
pub use grounding::{Grounded, GroundingEngine, GroundingRequest};
pub use lifecycle::{allowed_operations, validate_operation, Operation};
pub use store::{InMemoryMessageStore, MessageService, DIRECT_EDIT, UNGROUNDED_EDIT};
pub use types::{
    join_claim_text, partition_claims, Citation, ChunkId, Claim, ClaimStatus, Message, MessageId,
    MessageStatus, MessageSummary, MessageVersion, ReferenceId, VersionId, VersionSource,
};
pub use version::{validate_versions, VersionDraft};
pub use wire::{
    EditRequest, EditResponse, GenerateRequest, GenerationResult, RefineRequest, RefineResponse,
    ReferenceList, ReferenceSummary, StatusResponse, StatusUpdate, DEFAULT_TOP_K,
    INSUFFICIENT_EVIDENCE,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with grounded messages
    pub use crate::{
        Citation, Claim, ClaimStatus, GenerateRequest, GenerationResult, Message, MessageError,
        MessageId, MessageService, MessageStatus, ReferenceId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
