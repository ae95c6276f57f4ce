//! Seam to the external retrieval / generation / grounding engine.
//!
//! The engine owns retrieval, LLM calls and claim verification. This crate
//! only relies on the verdicts it returns.

use crate::error::MessageError;
use crate::types::{Citation, Claim, ReferenceId};
use async_trait::async_trait;

/// Input to a grounded generation or refinement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingRequest {
    /// Prompt (generate) or instruction (refine)
    pub text: String,
    pub reference_ids: Vec<ReferenceId>,
    pub top_k: u32,
}

/// Engine verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grounded {
    /// Claims tagged supported or dropped
    Claims(Vec<Claim>),
    /// Retrieval found nothing to ground against
    InsufficientEvidence,
}

#[async_trait]
pub trait GroundingEngine: Send + Sync {
    /// Produce claims for a fresh prompt
    async fn generate(&self, request: &GroundingRequest) -> Result<Grounded, MessageError>;

    /// Produce claims for a refinement of `previous_text`
    async fn refine(
        &self,
        previous_text: &str,
        request: &GroundingRequest,
    ) -> Result<Grounded, MessageError>;

    /// Re-derive claims for hand-edited text against existing evidence
    async fn check_edit(&self, text: &str, evidence: &[Citation])
        -> Result<Vec<Claim>, MessageError>;
}

#[async_trait]
impl<G: GroundingEngine + ?Sized> GroundingEngine for std::sync::Arc<G> {
    async fn generate(&self, request: &GroundingRequest) -> Result<Grounded, MessageError> {
        (**self).generate(request).await
    }

    async fn refine(
        &self,
        previous_text: &str,
        request: &GroundingRequest,
    ) -> Result<Grounded, MessageError> {
        (**self).refine(previous_text, request).await
    }

    async fn check_edit(
        &self,
        text: &str,
        evidence: &[Citation],
    ) -> Result<Vec<Claim>, MessageError> {
        (**self).check_edit(text, evidence).await
    }
}
