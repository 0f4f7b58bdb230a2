//! Draft store and persistence collaborator seams
//!
//! A repository plays both roles: it persists entity attribute state and it
//! keeps the append-only draft log. The manager drives both through one
//! [`UnitOfWork`] so an entity write and its draft commit or vanish together.

pub mod draft_list;
pub mod memory;

pub use draft_list::{DraftIter, DraftList, DEFAULT_PAGE_SIZE};
pub use memory::MemoryRepository;

use crate::codec::Snapshot;
use crate::errors::Result;
use crate::model::{AttributeMap, Draft, Entity, OperationType};

/// Append-only, per-entity draft log
///
/// No update or delete is exposed.
pub trait DraftStore {
    /// Append a draft in its own unit of work
    ///
    /// # Errors
    ///
    /// Any backend failure; the log is unchanged when this fails.
    fn append(&self, entity_id: &str, operation: OperationType, snapshot: Snapshot)
        -> Result<Draft>;

    /// Highest-sequence draft for the entity
    ///
    /// # Errors
    ///
    /// Backend read or decode failures.
    fn get_latest(&self, entity_id: &str) -> Result<Option<Draft>>;

    /// Up to `limit` drafts with `sequence > after_sequence`, ascending
    ///
    /// # Errors
    ///
    /// Backend read or decode failures.
    fn drafts_page(&self, entity_id: &str, after_sequence: u64, limit: usize)
        -> Result<Vec<Draft>>;

    /// Lazy, restartable view of every draft for the entity
    fn list(&self, entity_id: &str) -> DraftList<'_>
    where
        Self: Sized,
    {
        DraftList::new(self, entity_id)
    }
}

/// The entity persistence collaborator
pub trait EntityPersistence {
    /// Write the entity's entire attribute state in its own unit of work
    ///
    /// # Errors
    ///
    /// Backend write failures.
    fn persist(&self, entity: &Entity) -> Result<()>;

    /// True once the entity has been persisted at least once
    ///
    /// # Errors
    ///
    /// Backend read failures.
    fn has_prior_identity(&self, entity: &Entity) -> Result<bool>;

    /// Last persisted attribute state, `None` if never persisted
    ///
    /// # Errors
    ///
    /// Backend read failures.
    fn load_attributes(&self, entity_id: &str) -> Result<Option<AttributeMap>>;

    /// Snapshot of the newest draft, `None` if the entity has none
    ///
    /// # Errors
    ///
    /// Backend read or decode failures.
    fn load_latest_snapshot(&self, entity_id: &str) -> Result<Option<Snapshot>>;
}

/// One atomic PERSIST step
///
/// Writes are staged until [`UnitOfWork::commit`]. Dropping an uncommitted
/// unit of work discards everything it staged. While it is open it holds the
/// repository's write lock, so hooks running inside it must not call back
/// into the same repository.
pub trait UnitOfWork {
    /// # Errors
    ///
    /// Backend read failures.
    fn has_prior_identity(&self, entity_id: &str) -> Result<bool>;

    /// # Errors
    ///
    /// Backend read failures.
    fn load_attributes(&self, entity_id: &str) -> Result<Option<AttributeMap>>;

    /// Stage a full-state entity write
    ///
    /// # Errors
    ///
    /// The collaborator rejected the write.
    fn persist(&mut self, entity: &Entity) -> Result<()>;

    /// Stage a draft with the next sequence number for the entity
    ///
    /// # Errors
    ///
    /// The draft log rejected the append.
    fn append(
        &mut self,
        entity_id: &str,
        operation: OperationType,
        snapshot: Snapshot,
    ) -> Result<Draft>;

    /// Make every staged write durable
    ///
    /// # Errors
    ///
    /// Commit failed; nothing staged is visible.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// A backend that can serve as both collaborator and draft log
pub trait DraftRepository: DraftStore + EntityPersistence {
    /// Open a unit of work
    ///
    /// # Errors
    ///
    /// The backend could not start a transaction.
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>>;
}
