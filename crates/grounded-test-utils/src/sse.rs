//! Event-stream bodies and chunked transports

use futures::stream::{self, Stream};
use grounded_stream::{SseFrame, StreamError};
use serde_json::{json, Value};

pub fn status(stage: &str) -> SseFrame {
    SseFrame::new("status", json!({ "stage": stage }))
}

pub fn delta(text: &str) -> SseFrame {
    SseFrame::new("delta", json!({ "text": text }))
}

pub fn final_frame(payload: Value) -> SseFrame {
    SseFrame::new("final", payload)
}

pub fn error_frame(detail: &str) -> SseFrame {
    SseFrame::new("error", json!({ "detail": detail }))
}

/// Concatenate frames into one wire body
pub fn body(frames: &[SseFrame]) -> String {
    frames.iter().map(SseFrame::encode).collect()
}

/// `final` payload of the standard generate scenario
pub fn scenario_final_payload() -> Value {
    json!({
        "message_id": 42,
        "message_text": "X causes Y.",
        "claims": [{
            "text": "X causes Y",
            "citations": [{ "reference_id": 1, "chunk_id": 3 }],
            "status": "supported",
            "warning": null
        }],
        "warnings": []
    })
}

/// Frames of the standard generate scenario: every stage, a growing claims
/// document, then the final result
pub fn scenario_frames() -> Vec<SseFrame> {
    vec![
        status("retrieving"),
        status("generating"),
        delta(r#"{"claims":[{"te"#),
        delta(r#"xt":"X cau"#),
        delta(r#"ses Y","citations":[{"reference_id":1,"chunk_id":3}]}]}"#),
        status("verifying"),
        status("persisting"),
        final_frame(scenario_final_payload()),
    ]
}

pub fn scenario_body() -> String {
    body(&scenario_frames())
}

/// Split `body` into chunks of at most `size` bytes, ignoring UTF-8 boundaries
pub fn chunked(
    body: &str,
    size: usize,
) -> impl Stream<Item = Result<Vec<u8>, StreamError>> + Unpin {
    let chunks: Vec<Result<Vec<u8>, StreamError>> = body
        .as_bytes()
        .chunks(size.max(1))
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();
    stream::iter(chunks)
}

/// Split `body` at the given byte offsets
pub fn split_at(
    body: &str,
    offsets: &[usize],
) -> impl Stream<Item = Result<Vec<u8>, StreamError>> + Unpin {
    let bytes = body.as_bytes();
    let mut cuts: Vec<usize> = offsets.iter().map(|&o| o.min(bytes.len())).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks: Vec<Result<Vec<u8>, StreamError>> = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(bytes.len())) {
        chunks.push(Ok(bytes[start..cut].to_vec()));
        start = cut;
    }
    stream::iter(chunks)
}

/// Transport that yields `body` and then fails
pub fn failing_after(
    body: &str,
    reason: &str,
) -> impl Stream<Item = Result<Vec<u8>, StreamError>> + Unpin {
    stream::iter(vec![
        Ok(body.as_bytes().to_vec()),
        Err(StreamError::Transport(reason.to_string())),
    ])
}
