//! Message store contract and the in-memory reference store
//!
//! [`MessageService`] is the mutation/read contract shared by every store
//! implementation (the HTTP client implements it against the remote API).
//! [`InMemoryMessageStore`] implements it locally on top of a
//! [`GroundingEngine`], serializing every mutating operation per message id.

use crate::error::MessageError;
use crate::grounding::{Grounded, GroundingEngine, GroundingRequest};
use crate::lifecycle::{validate_operation, Operation};
use crate::types::{
    join_claim_text, partition_claims, Claim, Message, MessageId, MessageStatus, MessageSummary,
    VersionId, VersionSource,
};
use crate::version::VersionDraft;
use crate::wire::{
    EditRequest, EditResponse, GenerateRequest, GenerationResult, RefineRequest, RefineResponse,
    StatusResponse, DEFAULT_TOP_K, INSUFFICIENT_EVIDENCE,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Instruction recorded on versions produced by a direct edit
pub const DIRECT_EDIT: &str = "direct edit";

/// Warning attached to edits with no prior evidence
pub const UNGROUNDED_EDIT: &str =
    "Direct edit bypasses grounding verification. No previous evidence to check against.";

/// Mutation and read contract for message stores
///
/// Implementations must apply at most one mutating operation per message id
/// at a time.
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Append a refined version
    async fn refine(
        &self,
        id: MessageId,
        request: RefineRequest,
    ) -> Result<RefineResponse, MessageError>;

    /// Append an edited version; loss of grounding is reported, not blocking
    async fn edit(&self, id: MessageId, request: EditRequest)
        -> Result<EditResponse, MessageError>;

    /// Toggle `draft` / `finalized`
    async fn set_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<StatusResponse, MessageError>;

    /// Message with all versions, ascending
    async fn get_message(&self, id: MessageId) -> Result<Message, MessageError>;

    /// Every message with its latest version
    async fn list_messages(&self) -> Result<Vec<MessageSummary>, MessageError>;
}

/// In-process store backed by a grounding engine
#[derive(Debug)]
pub struct InMemoryMessageStore<G> {
    engine: G,
    messages: DashMap<MessageId, Arc<Mutex<Message>>>,
    next_message_id: AtomicI64,
    next_version_id: AtomicI64,
}

impl<G: GroundingEngine> InMemoryMessageStore<G> {
    #[must_use]
    pub fn new(engine: G) -> Self {
        Self {
            engine,
            messages: DashMap::new(),
            next_message_id: AtomicI64::new(1),
            next_version_id: AtomicI64::new(1),
        }
    }

    /// Number of persisted messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Non-streaming generate: version 1 of a new message on success
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerationResult, MessageError> {
        let request = request.validated()?;
        let grounding = GroundingRequest {
            text: request.prompt.clone(),
            reference_ids: request.reference_ids,
            top_k: request.top_k.unwrap_or(DEFAULT_TOP_K),
        };

        let claims = match self.engine.generate(&grounding).await? {
            Grounded::Claims(claims) => claims,
            Grounded::InsufficientEvidence => {
                tracing::info!("Generation found no evidence; nothing persisted");
                return Ok(GenerationResult::insufficient_evidence());
            }
        };

        let (supported, dropped) = partition_claims(claims);
        let message_text = join_claim_text(&supported);
        let warnings = dropped.iter().map(Claim::drop_warning).collect();

        let id = MessageId(self.next_message_id.fetch_add(1, Ordering::Relaxed));
        let mut all = supported.clone();
        all.extend(dropped);
        let draft = VersionDraft::new(
            VersionSource::Generated,
            request.prompt,
            message_text.clone(),
            all,
        );
        let message = Message::create(id, self.next_version_id(), draft, Utc::now())?;
        self.messages.insert(id, Arc::new(Mutex::new(message)));
        tracing::info!(message_id = %id, "Created message");

        Ok(GenerationResult {
            message_id: Some(id),
            message_text,
            claims: supported,
            warnings,
        })
    }

    fn next_version_id(&self) -> VersionId {
        VersionId(self.next_version_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Per-message lock handle; the map guard is released before returning
    fn handle(&self, id: MessageId) -> Result<Arc<Mutex<Message>>, MessageError> {
        self.messages
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(MessageError::NotFound(id))
    }
}

#[async_trait]
impl<G: GroundingEngine> MessageService for InMemoryMessageStore<G> {
    async fn refine(
        &self,
        id: MessageId,
        request: RefineRequest,
    ) -> Result<RefineResponse, MessageError> {
        let request = request.validated()?;
        let handle = self.handle(id)?;
        let mut message = handle.lock().await;
        if let Err(e) = validate_operation(id, message.status(), Operation::Refine) {
            tracing::warn!(message_id = %id, "Refine rejected: {}", e);
            return Err(e);
        }

        let latest = message.latest_version();
        let reference_ids = if request.reference_ids.is_empty() {
            latest.cited_references()
        } else {
            request.reference_ids
        };
        let grounding = GroundingRequest {
            text: request.instruction.clone(),
            reference_ids,
            top_k: request.top_k,
        };

        let claims = match self.engine.refine(&latest.message_text, &grounding).await? {
            Grounded::Claims(claims) => claims,
            Grounded::InsufficientEvidence => {
                return Err(MessageError::Grounding(INSUFFICIENT_EVIDENCE.to_string()))
            }
        };

        let supported: Vec<Claim> = claims.iter().filter(|c| c.is_supported()).cloned().collect();
        let warnings = claims
            .iter()
            .filter(|c| !c.is_supported())
            .map(Claim::drop_warning)
            .collect();
        let message_text = join_claim_text(&supported);

        let draft = VersionDraft::new(
            VersionSource::Refined,
            request.instruction,
            message_text.clone(),
            claims,
        );
        let version_number = message
            .append_version(self.next_version_id(), draft, Utc::now())?
            .version_number;

        Ok(RefineResponse {
            message_id: id,
            version_number,
            message_text,
            claims: supported,
            warnings,
        })
    }

    async fn edit(
        &self,
        id: MessageId,
        request: EditRequest,
    ) -> Result<EditResponse, MessageError> {
        let request = request.validated()?;
        let handle = self.handle(id)?;
        let mut message = handle.lock().await;
        if let Err(e) = validate_operation(id, message.status(), Operation::Edit) {
            tracing::warn!(message_id = %id, "Edit rejected: {}", e);
            return Err(e);
        }

        let evidence: Vec<_> = message.latest_version().citations().copied().collect();
        let (claims, warnings) = if evidence.is_empty() {
            (
                vec![Claim::supported(request.message_text.clone(), Vec::new())],
                vec![UNGROUNDED_EDIT.to_string()],
            )
        } else {
            let claims = self
                .engine
                .check_edit(&request.message_text, &evidence)
                .await?;
            let warnings = claims
                .iter()
                .filter(|c| !c.is_supported())
                .map(Claim::drop_warning)
                .collect();
            (claims, warnings)
        };

        let draft = VersionDraft::new(
            VersionSource::Edited,
            DIRECT_EDIT,
            request.message_text.clone(),
            claims,
        );
        let version_number = message
            .append_version(self.next_version_id(), draft, Utc::now())?
            .version_number;

        Ok(EditResponse {
            message_id: id,
            version_number,
            message_text: request.message_text,
            warnings,
        })
    }

    async fn set_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<StatusResponse, MessageError> {
        let handle = self.handle(id)?;
        let mut message = handle.lock().await;
        validate_operation(id, message.status(), Operation::SetStatus)?;
        if message.set_status(status, Utc::now()) {
            tracing::info!(message_id = %id, status = %status, "Status changed");
        }
        Ok(StatusResponse {
            id,
            status: message.status(),
        })
    }

    async fn get_message(&self, id: MessageId) -> Result<Message, MessageError> {
        let handle = self.handle(id)?;
        let message = handle.lock().await;
        Ok(message.clone())
    }

    async fn list_messages(&self) -> Result<Vec<MessageSummary>, MessageError> {
        let mut handles: Vec<_> = self
            .messages
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        handles.sort_by_key(|(id, _)| *id);

        let mut summaries = Vec::with_capacity(handles.len());
        for (_, handle) in handles {
            summaries.push(handle.lock().await.summary());
        }
        Ok(summaries)
    }
}
