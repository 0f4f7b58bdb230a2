//! In-memory repository
//!
//! Backs tests and embedders that do not need durability. A unit of work
//! holds the state lock for its whole lifetime and stages its writes, so
//! concurrent callers are serialized and an uncommitted unit of work leaves
//! no trace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{DraftRepository, DraftStore, EntityPersistence, UnitOfWork};
use crate::codec::Snapshot;
use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{AttributeMap, Draft, Entity, OperationType};

#[derive(Debug, Clone)]
struct StoredEntity {
    entity_type: String,
    attributes: AttributeMap,
}

#[derive(Debug, Default)]
struct MemoryState {
    entities: HashMap<String, StoredEntity>,
    drafts: HashMap<String, Vec<Draft>>,
}

impl MemoryState {
    fn latest_sequence(&self, entity_id: &str) -> u64 {
        self.drafts
            .get(entity_id)
            .and_then(|drafts| drafts.last())
            .map(Draft::sequence)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct Faults {
    entity_writes: AtomicBool,
    draft_appends: AtomicBool,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
    faults: Faults,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent entity write fail
    pub fn fail_entity_writes(&self, fail: bool) {
        self.faults.entity_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent draft append fail
    pub fn fail_draft_appends(&self, fail: bool) {
        self.faults.draft_appends.store(fail, Ordering::SeqCst);
    }

    /// Number of committed drafts for the entity
    pub fn draft_count(&self, entity_id: &str) -> usize {
        self.lock().drafts.get(entity_id).map(Vec::len).unwrap_or(0)
    }

    /// Entity type recorded at the entity's last persist
    pub fn persisted_entity_type(&self, entity_id: &str) -> Option<String> {
        self.lock()
            .entities
            .get(entity_id)
            .map(|stored| stored.entity_type.clone())
    }

    /// Committed state only changes inside `commit`, which runs no hooks; a
    /// lock poisoned by a panicking hook still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(
                component = module_path!(),
                op = "recover_lock",
                "Memory repository lock was poisoned by a panic; staged writes were discarded"
            );
            self.state.clear_poison();
            poisoned.into_inner()
        })
    }

    fn unit(&self) -> MemoryUnitOfWork<'_> {
        MemoryUnitOfWork {
            state: self.lock(),
            faults: &self.faults,
            staged_entities: Vec::new(),
            staged_drafts: Vec::new(),
        }
    }
}

impl DraftStore for MemoryRepository {
    fn append(
        &self,
        entity_id: &str,
        operation: OperationType,
        snapshot: Snapshot,
    ) -> Result<Draft> {
        let mut unit = self.unit();
        let draft = unit.append(entity_id, operation, snapshot)?;
        Box::new(unit).commit()?;
        Ok(draft)
    }

    fn get_latest(&self, entity_id: &str) -> Result<Option<Draft>> {
        let state = self.lock();
        Ok(state
            .drafts
            .get(entity_id)
            .and_then(|drafts| drafts.last())
            .cloned())
    }

    fn drafts_page(
        &self,
        entity_id: &str,
        after_sequence: u64,
        limit: usize,
    ) -> Result<Vec<Draft>> {
        let state = self.lock();
        Ok(state
            .drafts
            .get(entity_id)
            .map(|drafts| {
                drafts
                    .iter()
                    .filter(|d| d.sequence() > after_sequence)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl EntityPersistence for MemoryRepository {
    fn persist(&self, entity: &Entity) -> Result<()> {
        let mut unit = self.unit();
        unit.persist(entity)?;
        Box::new(unit).commit()
    }

    fn has_prior_identity(&self, entity: &Entity) -> Result<bool> {
        let state = self.lock();
        Ok(state.entities.contains_key(entity.id()))
    }

    fn load_attributes(&self, entity_id: &str) -> Result<Option<AttributeMap>> {
        let state = self.lock();
        Ok(state
            .entities
            .get(entity_id)
            .map(|stored| stored.attributes.clone()))
    }

    fn load_latest_snapshot(&self, entity_id: &str) -> Result<Option<Snapshot>> {
        Ok(self
            .get_latest(entity_id)?
            .map(|draft| draft.snapshot().clone()))
    }
}

impl DraftRepository for MemoryRepository {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>> {
        Ok(Box::new(self.unit()))
    }
}

struct MemoryUnitOfWork<'r> {
    state: MutexGuard<'r, MemoryState>,
    faults: &'r Faults,
    staged_entities: Vec<(String, StoredEntity)>,
    staged_drafts: Vec<Draft>,
}

impl UnitOfWork for MemoryUnitOfWork<'_> {
    fn has_prior_identity(&self, entity_id: &str) -> Result<bool> {
        Ok(self.state.entities.contains_key(entity_id)
            || self.staged_entities.iter().any(|(id, _)| id == entity_id))
    }

    fn load_attributes(&self, entity_id: &str) -> Result<Option<AttributeMap>> {
        let staged = self
            .staged_entities
            .iter()
            .rev()
            .find(|(id, _)| id == entity_id)
            .map(|(_, stored)| stored.attributes.clone());
        Ok(staged.or_else(|| {
            self.state
                .entities
                .get(entity_id)
                .map(|stored| stored.attributes.clone())
        }))
    }

    fn persist(&mut self, entity: &Entity) -> Result<()> {
        if self.faults.entity_writes.load(Ordering::SeqCst) {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("persist_entity")
                .with_entity_id(entity.id())
                .with_message("Entity write rejected"));
        }
        self.staged_entities.push((
            entity.id().to_string(),
            StoredEntity {
                entity_type: entity.entity_type().to_string(),
                attributes: entity.attributes().clone(),
            },
        ));
        Ok(())
    }

    fn append(
        &mut self,
        entity_id: &str,
        operation: OperationType,
        snapshot: Snapshot,
    ) -> Result<Draft> {
        if self.faults.draft_appends.load(Ordering::SeqCst) {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("append_draft")
                .with_entity_id(entity_id)
                .with_message("Draft append rejected"));
        }
        let staged_latest = self
            .staged_drafts
            .iter()
            .filter(|d| d.entity_id() == entity_id)
            .map(Draft::sequence)
            .max()
            .unwrap_or(0);
        let sequence = self.state.latest_sequence(entity_id).max(staged_latest) + 1;
        let draft = Draft::new(entity_id, operation, sequence, snapshot, Utc::now());
        self.staged_drafts.push(draft.clone());

        tracing::debug!(
            component = module_path!(),
            op = "append_draft",
            entity_id = entity_id,
            operation = operation.as_str(),
            sequence = sequence,
        );
        Ok(draft)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        let entities = std::mem::take(&mut self.staged_entities);
        let drafts = std::mem::take(&mut self.staged_drafts);
        for (id, stored) in entities {
            self.state.entities.insert(id, stored);
        }
        for draft in drafts {
            self.state
                .drafts
                .entry(draft.entity_id().to_string())
                .or_default()
                .push(draft);
        }
        Ok(())
    }
}
