//! A panicking hook must not wedge the repository for later calls

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use common::*;
use drafter_core::hooks::{HookContext, HookPhase, HookResult};
use drafter_core::store::MemoryRepository;
use drafter_core::{DraftManager, EntityPersistence, EntitySchema, OperationType};

const VOLATILE: &str = "volatile";

fn manager_with_panicking_type() -> DraftManager<MemoryRepository> {
    let mut registry = talkative_registry();
    let volatile = EntitySchema::new(VOLATILE)
        .on(
            OperationType::Create,
            HookPhase::Before,
            |_: &mut HookContext<'_>| -> HookResult { panic!("before hook blew up") },
        )
        .unwrap();
    registry.register(volatile).unwrap();
    DraftManager::new(MemoryRepository::new(), registry)
}

#[test]
fn test_save_succeeds_after_hook_panic() {
    let manager = manager_with_panicking_type();
    let mut volatile = drafter_core::Entity::new(VOLATILE);

    let outcome = catch_unwind(AssertUnwindSafe(|| manager.save_draft(&mut volatile)));
    assert!(outcome.is_err());

    let mut talkative = new_talkative();
    let draft = manager.save_draft(&mut talkative).unwrap();
    assert_eq!(draft.sequence(), 1);
    assert_eq!(manager.repository().draft_count(talkative.id()), 1);
}

#[test]
fn test_panicked_operation_leaves_no_trace() {
    let manager = manager_with_panicking_type();
    let mut volatile = drafter_core::Entity::new(VOLATILE).with_attribute("x", 1);

    let _ = catch_unwind(AssertUnwindSafe(|| manager.save_draft(&mut volatile)));

    assert!(!manager.repository().has_prior_identity(&volatile).unwrap());
    assert_eq!(manager.repository().draft_count(volatile.id()), 0);
    assert_eq!(manager.latest_draft(volatile.id()).unwrap(), None);
}
