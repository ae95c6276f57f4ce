//! Message lifecycle through the in-memory store

use futures::future::join_all;
use grounded_message::{
    EditRequest, GenerateRequest, InMemoryMessageStore, MessageError, MessageService,
    MessageStatus, RefineRequest, VersionSource, DIRECT_EDIT, INSUFFICIENT_EVIDENCE,
    UNGROUNDED_EDIT,
};
use grounded_test_utils::engine::{BELOW_THRESHOLD, NO_CITATIONS};
use grounded_test_utils::{citation, refs, sample_engine, store_with_draft, Proposal};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn generate_creates_first_version() {
    let (store, _engine, id) = store_with_draft(sample_engine()).await;
    let message = store.get_message(id).await.unwrap();

    assert_eq!(message.status(), MessageStatus::Draft);
    assert_eq!(message.versions().len(), 1);
    let v1 = message.latest_version();
    assert_eq!(v1.version_number, 1);
    assert_eq!(v1.source, VersionSource::Generated);
    assert_eq!(v1.prompt_or_instruction, "summarize X");
    assert_eq!(
        v1.message_text,
        "X causes Y in most patients Y is reduced when X is absent"
    );
}

#[tokio::test]
async fn generate_without_evidence_persists_nothing() {
    let store = InMemoryMessageStore::new(sample_engine());
    let result = store
        .generate(GenerateRequest::new("summarize Z", refs(&[9])))
        .await
        .unwrap();

    assert!(!result.is_persisted());
    assert!(result.message_text.is_empty());
    assert_eq!(result.warnings, vec![INSUFFICIENT_EVIDENCE.to_string()]);
    assert!(store.is_empty());
}

#[tokio::test]
async fn generate_reports_dropped_claims() {
    let engine = sample_engine().with_script(vec![
        Proposal::new("X causes Y", vec![citation(1, 3)]),
        Proposal::new("Z cures everything", vec![]),
        Proposal::new("Bananas are purple fruit", vec![citation(2, 7)]),
    ]);
    let store = InMemoryMessageStore::new(engine);
    let result = store
        .generate(GenerateRequest::new("summarize X", refs(&[1, 2])))
        .await
        .unwrap();

    assert_eq!(result.message_text, "X causes Y");
    assert_eq!(result.claims.len(), 1);
    assert_eq!(
        result.warnings,
        vec![
            format!("Dropped claim: 'Z cures everything' - {NO_CITATIONS}"),
            format!("Dropped claim: 'Bananas are purple fruit' - {BELOW_THRESHOLD}"),
        ]
    );

    let message = store.get_message(result.message_id.unwrap()).await.unwrap();
    assert_eq!(message.latest_version().dropped_claims.len(), 2);
}

#[tokio::test]
async fn refine_appends_version_and_passes_previous_text() {
    let (store, engine, id) = store_with_draft(sample_engine()).await;
    engine.push_script(vec![Proposal::new("X causes Y", vec![citation(1, 3)])]);

    let refined = store
        .refine(id, RefineRequest::new("make it shorter"))
        .await
        .unwrap();
    assert_eq!(refined.version_number, 2);
    assert_eq!(refined.message_text, "X causes Y");
    assert!(refined.warnings.is_empty());

    assert_eq!(
        engine.previous_texts(),
        vec!["X causes Y in most patients Y is reduced when X is absent".to_string()]
    );

    let message = store.get_message(id).await.unwrap();
    let v2 = message.version(2).unwrap();
    assert_eq!(v2.source, VersionSource::Refined);
    assert_eq!(v2.prompt_or_instruction, "make it shorter");
}

#[tokio::test]
async fn refine_without_cited_evidence_fails_cleanly() {
    let (store, _engine, id) = store_with_draft(sample_engine()).await;
    // Unrelated edit leaves the latest version with no citations
    store
        .edit(id, EditRequest::new("Completely unrelated words here"))
        .await
        .unwrap();

    let err = store
        .refine(id, RefineRequest::new("try again"))
        .await
        .unwrap_err();
    assert!(matches!(err, MessageError::Grounding(_)));
    assert_eq!(store.get_message(id).await.unwrap().versions().len(), 2);
}

#[tokio::test]
async fn edit_grounded_against_previous_evidence() {
    let (store, _engine, id) = store_with_draft(sample_engine()).await;

    let grounded = store
        .edit(id, EditRequest::new("X causes Y in patients"))
        .await
        .unwrap();
    assert_eq!(grounded.version_number, 2);
    assert!(grounded.warnings.is_empty());

    let ungrounded = store
        .edit(id, EditRequest::new("Bananas are purple"))
        .await
        .unwrap();
    assert_eq!(ungrounded.version_number, 3);
    assert_eq!(
        ungrounded.warnings,
        vec![format!("Dropped claim: 'Bananas are purple' - {BELOW_THRESHOLD}")]
    );

    // Version 3 cites nothing, so the next edit has no evidence to check
    let bypass = store.edit(id, EditRequest::new("Anything")).await.unwrap();
    assert_eq!(bypass.warnings, vec![UNGROUNDED_EDIT.to_string()]);

    let message = store.get_message(id).await.unwrap();
    let v4 = message.version(4).unwrap();
    assert_eq!(v4.source, VersionSource::Edited);
    assert_eq!(v4.prompt_or_instruction, DIRECT_EDIT);
    assert_eq!(v4.message_text, "Anything");
}

#[tokio::test]
async fn finalized_message_rejects_content_changes() {
    let (store, engine, id) = store_with_draft(sample_engine()).await;
    store.set_status(id, MessageStatus::Finalized).await.unwrap();
    let before = store.get_message(id).await.unwrap();
    let calls = engine.calls();

    let refine = store.refine(id, RefineRequest::new("more")).await;
    assert!(matches!(refine, Err(MessageError::Finalized(_))));
    let edit = store.edit(id, EditRequest::new("changed")).await;
    assert!(matches!(edit, Err(MessageError::Finalized(_))));

    assert_eq!(store.get_message(id).await.unwrap(), before);
    assert_eq!(engine.calls(), calls);
}

#[tokio::test]
async fn status_round_trip_keeps_versions() {
    let (store, _engine, id) = store_with_draft(sample_engine()).await;
    store.edit(id, EditRequest::new("X causes Y")).await.unwrap();
    let versions = store.get_message(id).await.unwrap().versions().to_vec();

    let finalized = store.set_status(id, MessageStatus::Finalized).await.unwrap();
    assert_eq!(finalized.status, MessageStatus::Finalized);
    let again = store.set_status(id, MessageStatus::Finalized).await.unwrap();
    assert_eq!(again.status, MessageStatus::Finalized);
    let reverted = store.set_status(id, MessageStatus::Draft).await.unwrap();
    assert_eq!(reverted.status, MessageStatus::Draft);

    let message = store.get_message(id).await.unwrap();
    assert_eq!(message.versions(), versions.as_slice());
    assert!(message.updated_at() >= message.created_at());

    store
        .refine(id, RefineRequest::new("resume").with_references(refs(&[1])))
        .await
        .unwrap();
}

#[tokio::test]
async fn list_shows_latest_version_of_each_message() {
    let (store, _engine, first) = store_with_draft(sample_engine()).await;
    let second = store
        .generate(GenerateRequest::new("summarize Y", refs(&[2])))
        .await
        .unwrap()
        .message_id
        .unwrap();
    store.edit(first, EditRequest::new("X causes Y")).await.unwrap();

    let listed = store.list_messages().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first);
    assert_eq!(listed[0].latest_version.version_number, 2);
    assert_eq!(listed[1].id, second);
    assert_eq!(listed[1].latest_version.version_number, 1);
}

#[tokio::test]
async fn mutations_on_one_message_are_serialized() {
    let engine = sample_engine().with_delay(Duration::from_millis(10));
    let (store, engine, id) = store_with_draft(engine).await;

    let refines = (0..5).map(|n| {
        store.refine(
            id,
            RefineRequest::new(format!("pass {n}")).with_references(refs(&[1, 2])),
        )
    });
    let outcomes = join_all(refines).await;
    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(engine.max_in_flight(), 1);

    let numbers: Vec<u32> = store
        .get_message(id)
        .await
        .unwrap()
        .versions()
        .iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn different_messages_are_not_serialized_together() {
    let engine = Arc::new(sample_engine().with_delay(Duration::from_millis(10)));
    let store = InMemoryMessageStore::new(Arc::clone(&engine));
    let a = store
        .generate(GenerateRequest::new("a", refs(&[1])))
        .await
        .unwrap()
        .message_id
        .unwrap();
    let b = store
        .generate(GenerateRequest::new("b", refs(&[2])))
        .await
        .unwrap()
        .message_id
        .unwrap();

    let (ra, rb) = tokio::join!(
        store.refine(a, RefineRequest::new("x").with_references(refs(&[1]))),
        store.refine(b, RefineRequest::new("y").with_references(refs(&[2]))),
    );
    ra.unwrap();
    rb.unwrap();
    assert_eq!(engine.max_in_flight(), 2);
}

#[derive(Debug, Clone)]
enum Op {
    Refine,
    Edit(String),
    Toggle,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Refine),
        "[a-zA-Z][a-zA-Z ]{0,23}".prop_map(Op::Edit),
        Just(Op::Toggle),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn version_numbers_stay_contiguous(ops in proptest::collection::vec(op(), 0..16)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let (store, _engine, id) = store_with_draft(sample_engine()).await;
            let mut expected = 1_u32;

            for op in ops {
                let finalized = store.get_message(id).await.unwrap().is_finalized();
                match op {
                    Op::Refine => {
                        let outcome = store
                            .refine(id, RefineRequest::new("again").with_references(refs(&[1, 2])))
                            .await;
                        assert_eq!(outcome.is_ok(), !finalized);
                        if !finalized {
                            expected += 1;
                        }
                    }
                    Op::Edit(text) => {
                        let outcome = store.edit(id, EditRequest::new(text)).await;
                        assert_eq!(outcome.is_ok(), !finalized);
                        if !finalized {
                            expected += 1;
                        }
                    }
                    Op::Toggle => {
                        let current = store.get_message(id).await.unwrap().status();
                        store.set_status(id, current.toggled()).await.unwrap();
                    }
                }
            }

            let message = store.get_message(id).await.unwrap();
            let numbers: Vec<u32> = message.versions().iter().map(|v| v.version_number).collect();
            assert_eq!(numbers, (1..=expected).collect::<Vec<_>>());
            assert!(message.verify_integrity().is_ok());
        });
    }
}
