#![allow(dead_code)]

use std::path::Path;

use drafter_core::hooks::{HookContext, HookPhase, HookResult};
use drafter_core::{DraftManager, DraftRegistry, Entity, EntitySchema, OperationType};
use drafter_store::SqliteRepository;

pub const TALKATIVE: &str = "talkative";

pub const BEFORE_COMMENT: &str = "before_comment";
pub const AROUND_EARLY_COMMENT: &str = "around_early_comment";
pub const AROUND_LATE_COMMENT: &str = "around_late_comment";
pub const AFTER_COMMENT: &str = "after_comment";

fn set_attribute(
    name: &'static str,
    value: String,
) -> impl Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static {
    move |ctx: &mut HookContext<'_>| {
        ctx.set(name, value.clone());
        Ok(())
    }
}

/// All nine lifecycle hooks, each leaving a comment naming itself
pub fn talkative_registry() -> DraftRegistry {
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

    let mut registry = DraftRegistry::new();
    registry.register(schema).unwrap();
    registry
}

pub fn sqlite_manager() -> DraftManager<SqliteRepository> {
    DraftManager::new(SqliteRepository::open_in_memory().unwrap(), talkative_registry())
}

pub fn sqlite_manager_at(path: &Path) -> DraftManager<SqliteRepository> {
    DraftManager::new(SqliteRepository::open(path).unwrap(), talkative_registry())
}

pub fn new_talkative() -> Entity {
    Entity::new(TALKATIVE)
}

pub fn reloaded(manager: &DraftManager<SqliteRepository>, entity: &Entity) -> Entity {
    let mut fresh = Entity::with_id(entity.id(), entity.entity_type());
    manager.reload(&mut fresh).unwrap();
    fresh
}
