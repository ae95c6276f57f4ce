//! End-to-end consumption of generation event streams

use futures::StreamExt;
use grounded_message::GenerationResult;
use grounded_stream::{
    consume, decode_all, EventCursor, NoopObserver, ProgressState, StreamError,
};
use grounded_test_utils::sse::{
    body, chunked, delta, error_frame, failing_after, final_frame, scenario_body,
    scenario_final_payload, split_at, status,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

#[tokio::test]
async fn generate_scenario_delivers_final_payload_unchanged() {
    let mut cursor = EventCursor::new(chunked(&scenario_body(), 7));
    let mut seen: Vec<ProgressState> = Vec::new();
    let result = consume(&mut cursor, &mut |state: &ProgressState| seen.push(state.clone()))
        .await
        .unwrap();

    let expected: GenerationResult = serde_json::from_value(scenario_final_payload()).unwrap();
    assert_eq!(result, expected);
    assert_eq!(result.message_id.map(|id| id.get()), Some(42));

    let last = seen.last().unwrap();
    assert_eq!(last.stage(), "done");
    assert!(last.buffer().is_empty());
    assert!(last.preview().is_empty());

    let previews: Vec<&str> = seen.iter().map(ProgressState::preview).collect();
    assert!(previews.contains(&"X cau"));
    assert!(previews.contains(&"X causes Y"));
}

#[tokio::test]
async fn stage_ranks_follow_status_events() {
    let wire = body(&[
        status("retrieving"),
        status("generating"),
        final_frame(scenario_final_payload()),
    ]);
    let mut cursor = EventCursor::new(chunked(&wire, 16));
    let mut ranks = Vec::new();
    consume(&mut cursor, &mut |state: &ProgressState| ranks.push(state.rank()))
        .await
        .unwrap();
    assert_eq!(ranks, vec![0, 1, 4]);
}

#[tokio::test]
async fn unknown_stage_ranks_below_everything() {
    let wire = body(&[status("embedding"), final_frame(scenario_final_payload())]);
    let mut cursor = EventCursor::new(chunked(&wire, 64));
    let mut ranks = Vec::new();
    consume(&mut cursor, &mut |state: &ProgressState| ranks.push(state.rank()))
        .await
        .unwrap();
    assert_eq!(ranks, vec![-1, 4]);
}

#[tokio::test]
async fn final_after_non_json_deltas_is_returned_verbatim() {
    let wire = body(&[
        delta("not json at all"),
        delta("{{{"),
        final_frame(scenario_final_payload()),
    ]);
    let result = consume(&mut EventCursor::new(chunked(&wire, 5)), &mut NoopObserver)
        .await
        .unwrap();
    assert_eq!(serde_json::to_value(result).unwrap(), scenario_final_payload());
}

#[tokio::test]
async fn stream_without_terminal_is_incomplete() {
    let wire = body(&[status("retrieving"), delta(r#"{"claims":[{"text":"X"#)]);
    let outcome = consume(&mut EventCursor::new(chunked(&wire, 9)), &mut NoopObserver).await;
    assert!(matches!(outcome, Err(StreamError::Incomplete)));
}

#[tokio::test]
async fn server_error_surfaces_detail() {
    let wire = body(&[status("generating"), error_frame("LLM provider unavailable")]);
    let mut last_stage = String::new();
    let outcome = consume(
        &mut EventCursor::new(chunked(&wire, 11)),
        &mut |state: &ProgressState| last_stage = state.stage().to_string(),
    )
    .await;
    match outcome {
        Err(StreamError::ServerReported { detail }) => {
            assert_eq!(detail, "LLM provider unavailable");
        }
        other => panic!("expected server error, got {other:?}"),
    }
    assert_eq!(last_stage, "generating");
}

#[tokio::test]
async fn frames_after_terminal_are_not_read() {
    let wire = body(&[
        error_frame("boom"),
        final_frame(scenario_final_payload()),
    ]);
    let mut cursor = EventCursor::new(chunked(&wire, 1024));
    assert!(consume(&mut cursor, &mut NoopObserver).await.is_err());
    assert!(cursor.is_closed());
}

#[tokio::test]
async fn transport_failure_is_terminal() {
    let wire = body(&[status("retrieving")]);
    let outcome = consume(&mut EventCursor::new(failing_after(&wire, "reset")), &mut NoopObserver).await;
    assert!(matches!(outcome, Err(StreamError::Transport(_))));
}

#[tokio::test]
async fn malformed_payload_is_protocol_error() {
    let wire = "event: delta\ndata: {broken\n\n";
    let outcome = consume(&mut EventCursor::new(chunked(wire, 4)), &mut NoopObserver).await;
    assert!(outcome.unwrap_err().is_protocol());
}

#[tokio::test]
async fn cursor_stream_yields_every_frame() {
    let frames: Vec<_> = EventCursor::new(chunked(&scenario_body(), 3))
        .into_stream()
        .collect()
        .await;
    assert_eq!(frames.len(), 8);
    assert!(frames.iter().all(Result::is_ok));
}

#[test]
fn crlf_body_decodes_like_lf_body() {
    let lf = body(&[status("verifying"), delta("a")]);
    let crlf = lf.replace('\n', "\r\n");
    assert_eq!(
        decode_all(crlf.as_bytes()).unwrap(),
        decode_all(lf.as_bytes()).unwrap()
    );
}

#[test]
fn multibyte_text_survives_decoding() {
    let wire = body(&[delta("naïve café ✓")]);
    let frames = decode_all(wire.as_bytes()).unwrap();
    assert_eq!(frames[0].data, json!({ "text": "naïve café ✓" }));
}

fn collect_frames(wire: &str, offsets: &[usize]) -> Vec<grounded_stream::SseFrame> {
    tokio_test::block_on(async {
        EventCursor::new(split_at(wire, offsets))
            .into_stream()
            .map(Result::unwrap)
            .collect()
            .await
    })
}

proptest! {
    #[test]
    fn frames_do_not_depend_on_chunk_boundaries(
        offsets in proptest::collection::vec(0usize..400, 0..12),
        text in "[a-zé✓ ]{0,20}",
    ) {
        let wire = body(&[
            status("retrieving"),
            delta(&text),
            status("generating"),
            final_frame(scenario_final_payload()),
        ]);
        let whole = decode_all(wire.as_bytes()).unwrap();
        prop_assert_eq!(collect_frames(&wire, &offsets), whole);
    }

    #[test]
    fn chunk_size_does_not_change_the_outcome(size in 1usize..64) {
        let result = tokio_test::block_on(consume(
            &mut EventCursor::new(chunked(&scenario_body(), size)),
            &mut NoopObserver,
        ))
        .unwrap();
        prop_assert_eq!(result.message_id.map(|id| id.get()), Some(42));
    }
}
