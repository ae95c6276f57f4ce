//! Deterministic grounding engine over an in-memory chunk corpus

use async_trait::async_trait;
use grounded_message::{
    Citation, ChunkId, Claim, Grounded, GroundingEngine, GroundingRequest, MessageError,
    ReferenceId,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Minimum share of claim words found in a chunk for a citation to hold
pub const OVERLAP_THRESHOLD: f64 = 0.3;

pub const NO_CITATIONS: &str = "No citations provided";
pub const BELOW_THRESHOLD: &str = "All citations invalid or below overlap threshold";

/// One evidence chunk
#[derive(Debug, Clone)]
pub struct Chunk {
    pub reference_id: ReferenceId,
    pub chunk_id: ChunkId,
    pub content: String,
}

/// Claim as proposed by the generator, before verification
#[derive(Debug, Clone)]
pub struct Proposal {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl Proposal {
    pub fn new(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }
}

/// Fake engine: retrieval filters the corpus by reference id, generation
/// replays scripted proposals, verification is word overlap.
///
/// Without a script, each retrieved chunk becomes one proposal citing itself.
#[derive(Debug, Default)]
pub struct FakeGroundingEngine {
    corpus: Vec<Chunk>,
    script: Mutex<VecDeque<Vec<Proposal>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    previous_texts: Mutex<Vec<String>>,
}

impl FakeGroundingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_chunk(
        mut self,
        reference_id: i64,
        chunk_id: i64,
        content: impl Into<String>,
    ) -> Self {
        self.corpus.push(Chunk {
            reference_id: reference_id.into(),
            chunk_id: chunk_id.into(),
            content: content.into(),
        });
        self
    }

    /// Queue the proposals returned by the next generate or refine call
    #[must_use]
    pub fn with_script(self, proposals: Vec<Proposal>) -> Self {
        self.script.lock().push_back(proposals);
        self
    }

    /// Sleep inside every call, to widen race windows in concurrency tests
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_script(&self, proposals: Vec<Proposal>) {
        self.script.lock().push_back(proposals);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Previous texts passed to `refine`, in call order
    pub fn previous_texts(&self) -> Vec<String> {
        self.previous_texts.lock().clone()
    }

    fn retrieve(&self, request: &GroundingRequest) -> Vec<&Chunk> {
        self.corpus
            .iter()
            .filter(|chunk| request.reference_ids.contains(&chunk.reference_id))
            .take(request.top_k as usize)
            .collect()
    }

    fn chunk(&self, chunk_id: ChunkId) -> Option<&Chunk> {
        self.corpus.iter().find(|chunk| chunk.chunk_id == chunk_id)
    }

    fn verify(&self, proposal: Proposal, available: &[&Chunk]) -> Claim {
        if proposal.citations.is_empty() {
            return Claim::dropped(proposal.text, NO_CITATIONS);
        }
        let valid: Vec<Citation> = proposal
            .citations
            .into_iter()
            .filter(|citation| {
                available
                    .iter()
                    .find(|chunk| chunk.chunk_id == citation.chunk_id)
                    .is_some_and(|chunk| overlap(&proposal.text, &chunk.content) >= OVERLAP_THRESHOLD)
            })
            .collect();
        if valid.is_empty() {
            Claim::dropped(proposal.text, BELOW_THRESHOLD)
        } else {
            Claim::supported(proposal.text, valid)
        }
    }

    async fn ground(&self, request: &GroundingRequest) -> Grounded {
        let _guard = self.enter().await;
        let available = self.retrieve(request);
        if available.is_empty() {
            return Grounded::InsufficientEvidence;
        }
        let proposals = self.script.lock().pop_front().unwrap_or_else(|| {
            available
                .iter()
                .map(|chunk| {
                    Proposal::new(
                        chunk.content.clone(),
                        vec![Citation::new(chunk.reference_id, chunk.chunk_id)],
                    )
                })
                .collect()
        });
        Grounded::Claims(
            proposals
                .into_iter()
                .map(|proposal| self.verify(proposal, &available))
                .collect(),
        )
    }

    async fn enter(&self) -> InFlight<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        InFlight(&self.in_flight)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GroundingEngine for FakeGroundingEngine {
    async fn generate(&self, request: &GroundingRequest) -> Result<Grounded, MessageError> {
        Ok(self.ground(request).await)
    }

    async fn refine(
        &self,
        previous_text: &str,
        request: &GroundingRequest,
    ) -> Result<Grounded, MessageError> {
        self.previous_texts.lock().push(previous_text.to_string());
        Ok(self.ground(request).await)
    }

    async fn check_edit(
        &self,
        text: &str,
        evidence: &[Citation],
    ) -> Result<Vec<Claim>, MessageError> {
        let _guard = self.enter().await;
        let available: Vec<&Chunk> = evidence
            .iter()
            .filter_map(|citation| self.chunk(citation.chunk_id))
            .collect();
        Ok(vec![self.verify(Proposal::new(text, evidence.to_vec()), &available)])
    }
}

/// Share of distinct lowercase claim words that also occur in `content`
#[must_use]
pub fn overlap(claim: &str, content: &str) -> f64 {
    let claim_words: std::collections::HashSet<String> =
        claim.split_whitespace().map(str::to_lowercase).collect();
    if claim_words.is_empty() {
        return 0.0;
    }
    let content_words: std::collections::HashSet<String> =
        content.split_whitespace().map(str::to_lowercase).collect();
    let shared = claim_words.intersection(&content_words).count();
    #[allow(clippy::cast_precision_loss)]
    let score = shared as f64 / claim_words.len() as f64;
    score
}
