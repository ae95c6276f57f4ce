//! Testing utilities for the grounded messaging workspace
//!
//! Shared fakes, fixtures, and event-stream builders.

#![allow(missing_docs)]

pub mod engine;
pub mod sse;

pub use engine::{FakeGroundingEngine, Proposal};

use grounded_message::{
    Citation, GenerateRequest, InMemoryMessageStore, MessageId, ReferenceId,
};
use std::sync::Arc;

pub fn citation(reference_id: i64, chunk_id: i64) -> Citation {
    Citation::new(reference_id, chunk_id)
}

pub fn refs(ids: &[i64]) -> Vec<ReferenceId> {
    ids.iter().copied().map(ReferenceId::from).collect()
}

/// Engine with two references about X and Y, one chunk each
pub fn sample_engine() -> FakeGroundingEngine {
    FakeGroundingEngine::new()
        .with_chunk(1, 3, "X causes Y in most patients")
        .with_chunk(2, 7, "Y is reduced when X is absent")
}

/// Store over `engine` holding one freshly generated draft
pub async fn store_with_draft(
    engine: FakeGroundingEngine,
) -> (InMemoryMessageStore<Arc<FakeGroundingEngine>>, Arc<FakeGroundingEngine>, MessageId) {
    let engine = Arc::new(engine);
    let store = InMemoryMessageStore::new(Arc::clone(&engine));
    let result = store
        .generate(GenerateRequest::new("summarize X", refs(&[1, 2])))
        .await
        .expect("generate succeeds");
    let id = result.message_id.expect("sample corpus grounds the draft");
    (store, engine, id)
}
