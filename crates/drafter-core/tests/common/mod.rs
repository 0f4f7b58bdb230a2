#![allow(dead_code)]

use drafter_core::hooks::{HookContext, HookPhase, HookResult};
use drafter_core::store::MemoryRepository;
use drafter_core::{
    DestroySnapshot, DraftManager, DraftRegistry, Entity, EntitySchema, OperationType,
};

pub const TALKATIVE: &str = "talkative";

pub const BEFORE_COMMENT: &str = "before_comment";
pub const AROUND_EARLY_COMMENT: &str = "around_early_comment";
pub const AROUND_LATE_COMMENT: &str = "around_late_comment";
pub const AFTER_COMMENT: &str = "after_comment";

/// Hook that overwrites one attribute with a fixed string
pub fn set_attribute(
    name: &'static str,
    value: impl Into<String>,
) -> impl Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static {
    let value = value.into();
    move |ctx: &mut HookContext<'_>| {
        ctx.set(name, value.clone());
        Ok(())
    }
}

/// A Talkative registers all nine hooks:
///
/// - before / around / after creation
/// - before / around / after update
/// - before / around / after destruction
///
/// Each one writes "I changed <phase> <operation>" into its own attribute.
pub fn talkative_schema() -> EntitySchema {
    let mut schema = EntitySchema::new(TALKATIVE).with_attributes([
        BEFORE_COMMENT,
        AROUND_EARLY_COMMENT,
        AROUND_LATE_COMMENT,
        AFTER_COMMENT,
    ]);

    for (operation, noun) in [
        (OperationType::Create, "creation"),
        (OperationType::Update, "update"),
        (OperationType::Destroy, "destroy"),
    ] {
        let hooks = schema.hooks_mut();
        hooks
            .register_hook(
                operation,
                HookPhase::Before,
                set_attribute(BEFORE_COMMENT, format!("I changed before {noun}")),
            )
            .unwrap();
        hooks.register_around(
            operation,
            set_attribute(
                AROUND_EARLY_COMMENT,
                format!("I changed around {noun} (before yield)"),
            ),
            set_attribute(
                AROUND_LATE_COMMENT,
                format!("I changed around {noun} (after yield)"),
            ),
        );
        hooks
            .register_hook(
                operation,
                HookPhase::After,
                set_attribute(AFTER_COMMENT, format!("I changed after {noun}")),
            )
            .unwrap();
    }

    schema
}

pub fn talkative_registry() -> DraftRegistry {
    let mut registry = DraftRegistry::new();
    registry.register(talkative_schema()).unwrap();
    registry
}

pub fn talkative_manager() -> DraftManager<MemoryRepository> {
    DraftManager::new(MemoryRepository::new(), talkative_registry())
}

pub fn talkative_manager_with(destroy_snapshot: DestroySnapshot) -> DraftManager<MemoryRepository> {
    talkative_manager().with_destroy_snapshot(destroy_snapshot)
}

pub fn new_talkative() -> Entity {
    Entity::new(TALKATIVE)
}

/// A fresh handle on a stored entity, reloaded from the repository
pub fn reloaded(manager: &DraftManager<MemoryRepository>, entity: &Entity) -> Entity {
    let mut fresh = Entity::with_id(entity.id(), entity.entity_type());
    manager.reload(&mut fresh).unwrap();
    fresh
}
