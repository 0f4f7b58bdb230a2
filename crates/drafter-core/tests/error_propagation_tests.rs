//! How each failure point surfaces and what it leaves behind

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use drafter_core::core_types::{RequestContext, RequestId, TraceId};
use drafter_core::errors::{ExError, ExErrorKind};
use drafter_core::hooks::{HookContext, HookPhase, HookResult};
use drafter_core::store::MemoryRepository;
use drafter_core::{
    DraftError, DraftManager, DraftRegistry, Entity, EntityPersistence, EntitySchema,
    OperationType,
};

fn reject(_: &mut HookContext<'_>) -> HookResult {
    Err(ExError::rejected("title is required"))
}

fn manager_with(schema: EntitySchema) -> DraftManager<MemoryRepository> {
    let mut registry = DraftRegistry::new();
    registry.register(schema).unwrap();
    DraftManager::new(MemoryRepository::new(), registry)
}

#[test]
fn test_before_failure_is_validation_failure_with_no_side_effects() {
    let manager = manager_with(
        EntitySchema::new("note")
            .on(OperationType::Create, HookPhase::Before, reject)
            .unwrap(),
    );
    let mut note = Entity::new("note");

    let err = manager.save_draft(&mut note).unwrap_err();

    match &err {
        DraftError::ValidationFailure {
            operation, phase, ..
        } => {
            assert_eq!(*operation, OperationType::Create);
            assert_eq!(*phase, HookPhase::Before);
        }
        other => panic!("expected ValidationFailure, got {other:?}"),
    }
    assert!(!err.is_committed());
    assert!(!manager.repository().has_prior_identity(&note).unwrap());
    assert_eq!(manager.latest_draft(note.id()).unwrap(), None);
}

#[test]
fn test_around_pre_failure_aborts_like_before() {
    let manager = manager_with(EntitySchema::new("note").around(
        OperationType::Create,
        reject,
        set_attribute("never", "runs"),
    ));
    let mut note = Entity::new("note");

    let err = manager.save_draft(&mut note).unwrap_err();

    assert!(matches!(
        err,
        DraftError::ValidationFailure {
            phase: HookPhase::AroundPre,
            ..
        }
    ));
    assert_eq!(note.get("never"), None);
    assert_eq!(manager.repository().draft_count(note.id()), 0);
}

#[test]
fn test_entity_write_failure_is_persistence_failure() {
    let manager = talkative_manager();
    manager.repository().fail_entity_writes(true);
    let mut talkative = new_talkative();

    let err = manager.save_draft(&mut talkative).unwrap_err();

    assert!(matches!(err, DraftError::PersistenceFailure { .. }));
    assert_eq!(err.kind(), ExErrorKind::PersistenceFailure);
    assert_eq!(manager.latest_draft(talkative.id()).unwrap(), None);
    // pre-persist hooks ran, post-persist hooks did not
    assert_eq!(talkative.get_str(BEFORE_COMMENT), Some("I changed before creation"));
    assert_eq!(talkative.get(AFTER_COMMENT), None);
}

#[test]
fn test_append_failure_rolls_back_entity_write() {
    let manager = talkative_manager();
    manager.repository().fail_draft_appends(true);
    let mut talkative = new_talkative();

    let err = manager.save_draft(&mut talkative).unwrap_err();

    assert!(matches!(err, DraftError::StorageUnavailable { .. }));
    assert!(!manager.repository().has_prior_identity(&talkative).unwrap());
    assert_eq!(manager.repository().load_attributes(talkative.id()).unwrap(), None);
    assert_eq!(talkative.get(AFTER_COMMENT), None);
}

#[test]
fn test_append_failure_on_update_keeps_previous_state() {
    let manager = talkative_manager();
    let mut talkative = new_talkative();
    manager.save_draft(&mut talkative).unwrap();
    manager.repository().fail_draft_appends(true);

    let err = manager.save_draft(&mut talkative).unwrap_err();

    assert!(matches!(err, DraftError::StorageUnavailable { .. }));
    let stored = reloaded(&manager, &talkative);
    assert_eq!(stored.get_str(BEFORE_COMMENT), Some("I changed before creation"));
    assert_eq!(manager.repository().draft_count(talkative.id()), 1);
}

#[test]
fn test_after_failure_carries_committed_draft() {
    let manager = manager_with(
        EntitySchema::new("note")
            .on(OperationType::Create, HookPhase::Before, set_attribute("title", "kept"))
            .unwrap()
            .on(OperationType::Create, HookPhase::After, reject)
            .unwrap(),
    );
    let mut note = Entity::new("note");

    let err = manager.save_draft(&mut note).unwrap_err();

    assert!(err.is_committed());
    let draft = err.committed_draft().expect("draft attached");
    assert_eq!(draft.sequence(), 1);
    assert_eq!(draft.reify().get_str("title"), Some("kept"));
    assert_eq!(manager.latest_draft(note.id()).unwrap().as_ref(), Some(draft));
    assert!(manager.repository().has_prior_identity(&note).unwrap());
}

#[test]
fn test_around_post_failure_skips_remaining_post_hooks() {
    let manager = manager_with(
        EntitySchema::new("note")
            .around(OperationType::Create, set_attribute("pre", "ran"), reject)
            .on(OperationType::Create, HookPhase::After, set_attribute("after", "ran"))
            .unwrap(),
    );
    let mut note = Entity::new("note");

    let err = manager.save_draft(&mut note).unwrap_err();

    match err {
        DraftError::PostPersistHookFailure { phase, .. } => {
            assert_eq!(phase, HookPhase::AroundPost)
        }
        other => panic!("expected PostPersistHookFailure, got {other:?}"),
    }
    assert_eq!(note.get("after"), None);
}

#[test]
fn test_destroy_post_failure_still_stages_destroy() {
    let manager = manager_with(
        EntitySchema::new("note")
            .on(OperationType::Destroy, HookPhase::After, reject)
            .unwrap(),
    );
    let mut note = Entity::new("note");
    manager.save_draft(&mut note).unwrap();

    let err = manager.draft_destruction(&mut note).unwrap_err();

    let draft = err.committed_draft().unwrap();
    assert!(draft.is_destroy());
    assert_eq!(manager.latest_draft(note.id()).unwrap().as_ref(), Some(draft));
}

#[test]
fn test_unregistered_type_is_not_draftable() {
    let manager = talkative_manager();
    let mut stranger = Entity::new("stranger");

    let err = manager.save_draft(&mut stranger).unwrap_err();

    assert!(matches!(err, DraftError::NotDraftable { ref entity_type } if entity_type == "stranger"));
    let ex: ExError = err.into();
    assert_eq!(ex.code(), "ERR_NOT_DRAFTABLE");
}

#[test]
fn test_hook_errors_carry_request_correlation() {
    let manager = manager_with(
        EntitySchema::new("note")
            .on(OperationType::Create, HookPhase::Before, reject)
            .unwrap(),
    );
    let request = RequestContext::with_request_id(RequestId::from_string("req-42"))
        .with_trace_id(TraceId::from_string("trace-7"));
    let mut note = Entity::new("note");

    let err = manager.save_draft_in(&mut note, &request).unwrap_err();

    let ex: ExError = err.into();
    let source = ex.source_error().expect("hook error kept as source");
    assert_eq!(source.request_id().map(RequestId::as_str), Some("req-42"));
    assert_eq!(source.trace_id().map(TraceId::as_str), Some("trace-7"));
    assert_eq!(source.entity_id(), Some(note.id()));
    assert_eq!(source.message(), "title is required");
}
