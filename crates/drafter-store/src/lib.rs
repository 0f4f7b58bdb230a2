//! drafter store: SQLite persistence for drafter
//!
//! [`SqliteRepository`] implements the core repository traits on one
//! connection: an `entities` table holding each entity's last persisted
//! attribute state and an append-only `drafts` ledger. Schema changes ship as
//! embedded, checksummed migrations.
//!
//! ```
//! use drafter_core::{DraftManager, DraftRegistry, EntitySchema};
//! use drafter_store::SqliteRepository;
//!
//! let mut registry = DraftRegistry::new();
//! registry.register(EntitySchema::new("note")).unwrap();
//! let manager = DraftManager::new(SqliteRepository::open_in_memory().unwrap(), registry);
//!
//! let mut note = manager.registry().get("note").unwrap().new_entity();
//! note.set("title", "first");
//! let draft = manager.save_draft(&mut note).unwrap();
//! assert_eq!(manager.latest_draft(note.id()).unwrap(), Some(draft));
//! ```

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use repo::SqliteRepository;
