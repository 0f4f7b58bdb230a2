//! drafter core: change tracking for entity lifecycle operations
//!
//! A [`DraftManager`] runs each CREATE, UPDATE or DESTROY through an ordered
//! hook pipeline and captures an immutable attribute [`Draft`] at the
//! persistence boundary:
//!
//! - BEFORE and AROUND_PRE mutations are persisted and captured
//! - AROUND_POST and AFTER mutations stay on the live entity only
//! - drafts are append-only with per-entity sequence numbers starting at 1
//! - any draft can be reified into a detached attribute view
//!
//! # Example
//!
//! ```
//! use drafter_core::hooks::{HookContext, HookPhase, HookResult};
//! use drafter_core::store::MemoryRepository;
//! use drafter_core::{DraftManager, DraftRegistry, EntitySchema, OperationType};
//!
//! let schema = EntitySchema::new("note")
//!     .on(OperationType::Create, HookPhase::Before, |ctx: &mut HookContext<'_>| -> HookResult {
//!         ctx.set("status", "drafted");
//!         Ok(())
//!     })
//!     .unwrap();
//! let mut registry = DraftRegistry::new();
//! registry.register(schema).unwrap();
//!
//! let manager = DraftManager::new(MemoryRepository::new(), registry);
//! let mut note = manager.registry().get("note").unwrap().new_entity();
//! let draft = manager.save_draft(&mut note).unwrap();
//!
//! assert_eq!(draft.sequence(), 1);
//! assert_eq!(draft.reify().get_str("status"), Some("drafted"));
//! ```

pub use drafter_core_types as core_types;

pub mod codec;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod logging_facility;
pub mod manager;
pub mod model;
pub mod reify;
pub mod schema;
pub mod store;

pub use codec::Snapshot;
pub use config::{DestroySnapshot, DrafterConfig};
pub use errors::{DraftError, ExError, ExErrorKind, Result};
pub use manager::{DraftManager, EntityState};
pub use model::{AttributeMap, AttributeValue, Draft, Entity, OperationType};
pub use reify::{reify, reify_with_schema, ReifiedDraft};
pub use schema::{DraftRegistry, EntitySchema};
pub use store::{DraftRepository, DraftStore, EntityPersistence, UnitOfWork};
