//! Draft manager: the public entry point for draft-producing operations
//!
//! Wires the hook pipeline, the snapshot codec and a [`DraftRepository`].
//! The repository unit of work is opened before BEFORE hooks run and
//! committed inside PERSIST, so hooks, the entity write and the draft
//! append form one atomic step; AROUND_POST and AFTER run once it has
//! committed.
//!
//! CREATE and UPDATE persist the entity immediately. DESTROY only stages a
//! destroy draft; removing the entity is the caller's business.

use std::time::Instant;

use crate::codec;
use crate::config::{DestroySnapshot, DrafterConfig};
use crate::core_types::RequestContext;
use crate::errors::{DraftError, ExError, ExErrorKind, Result};
use crate::hooks::{Pipeline, PipelineRun};
use crate::model::{Draft, Entity, OperationType};
use crate::schema::{DraftRegistry, EntitySchema};
use crate::store::{DraftList, DraftRepository};
use crate::{log_op_end, log_op_error, log_op_start};

/// Lifecycle position of an entity as seen by drafting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Never persisted
    New,
    /// Persisted, latest draft (if any) is a CREATE or UPDATE
    Persisted,
    /// Latest draft is a DESTROY; the entity itself is still live
    DestroyStaged,
}

pub struct DraftManager<R: DraftRepository> {
    repository: R,
    registry: DraftRegistry,
    destroy_snapshot: DestroySnapshot,
}

impl<R: DraftRepository> DraftManager<R> {
    pub fn new(repository: R, registry: DraftRegistry) -> Self {
        Self {
            repository,
            registry,
            destroy_snapshot: DestroySnapshot::default(),
        }
    }

    pub fn from_config(repository: R, registry: DraftRegistry, config: &DrafterConfig) -> Self {
        Self::new(repository, registry).with_destroy_snapshot(config.destroy_snapshot)
    }

    pub fn with_destroy_snapshot(mut self, destroy_snapshot: DestroySnapshot) -> Self {
        self.destroy_snapshot = destroy_snapshot;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn registry(&self) -> &DraftRegistry {
        &self.registry
    }

    pub fn destroy_snapshot(&self) -> DestroySnapshot {
        self.destroy_snapshot
    }

    /// True once `entity_type` is registered for drafting
    pub fn draftable(&self, entity_type: &str) -> bool {
        self.registry.draftable(entity_type)
    }

    /// CREATE (no prior identity) or UPDATE the entity and record a draft
    ///
    /// The entity's entire in-memory attribute state is written, including
    /// values left behind by earlier post-persist hooks.
    ///
    /// # Errors
    ///
    /// - `NotDraftable`: entity type not registered
    /// - `ValidationFailure`: a BEFORE or AROUND_PRE hook failed; nothing written
    /// - `PersistenceFailure` / `StorageUnavailable`: PERSIST failed; nothing written
    /// - `PostPersistHookFailure`: committed, then a later hook failed; carries the draft
    /// - `Backend`: the repository could not be read
    pub fn save_draft(&self, entity: &mut Entity) -> std::result::Result<Draft, DraftError> {
        self.save_draft_in(entity, &RequestContext::new())
    }

    /// [`DraftManager::save_draft`] under a caller-supplied request context
    ///
    /// # Errors
    ///
    /// See [`DraftManager::save_draft`].
    pub fn save_draft_in(
        &self,
        entity: &mut Entity,
        request: &RequestContext,
    ) -> std::result::Result<Draft, DraftError> {
        self.observed("save_draft", entity, request, |entity| {
            self.run_save(entity, request)
        })
    }

    /// Record a DESTROY draft without removing the entity
    ///
    /// # Errors
    ///
    /// As for [`DraftManager::save_draft`] (never `PersistenceFailure`), plus
    /// `NotPersisted` when the entity has never been persisted.
    pub fn draft_destruction(&self, entity: &mut Entity) -> std::result::Result<Draft, DraftError> {
        self.draft_destruction_in(entity, &RequestContext::new())
    }

    /// [`DraftManager::draft_destruction`] under a caller-supplied request context
    ///
    /// # Errors
    ///
    /// See [`DraftManager::draft_destruction`].
    pub fn draft_destruction_in(
        &self,
        entity: &mut Entity,
        request: &RequestContext,
    ) -> std::result::Result<Draft, DraftError> {
        self.observed("draft_destruction", entity, request, |entity| {
            self.run_destruction(entity, request)
        })
    }

    /// Replace the entity's attributes with its persisted state
    ///
    /// # Errors
    ///
    /// `NotFound` if the entity was never persisted, or a backend read error.
    pub fn reload(&self, entity: &mut Entity) -> Result<()> {
        let start = Instant::now();
        log_op_start!("reload", entity_id = entity.id());

        let result = self
            .repository
            .load_attributes(entity.id())
            .and_then(|attributes| {
                attributes.ok_or_else(|| {
                    ExError::new(ExErrorKind::NotFound)
                        .with_op("reload")
                        .with_entity_id(entity.id())
                        .with_message("Entity has never been persisted")
                })
            });

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(attributes) => {
                entity.replace_attributes(attributes);
                log_op_end!("reload", duration_ms = duration_ms, entity_id = entity.id());
                Ok(())
            }
            Err(err) => {
                log_op_error!("reload", err.clone(), duration_ms = duration_ms, entity_id = entity.id());
                Err(err)
            }
        }
    }

    /// Newest draft for the entity
    ///
    /// # Errors
    ///
    /// Backend read or decode failures.
    pub fn latest_draft(&self, entity_id: &str) -> Result<Option<Draft>> {
        self.repository.get_latest(entity_id)
    }

    /// Every draft for the entity, read lazily in sequence order
    pub fn drafts(&self, entity_id: &str) -> DraftList<'_> {
        self.repository.list(entity_id)
    }

    /// # Errors
    ///
    /// Backend read or decode failures.
    pub fn entity_state(&self, entity: &Entity) -> Result<EntityState> {
        if !self.repository.has_prior_identity(entity)? {
            return Ok(EntityState::New);
        }
        match self.repository.get_latest(entity.id())? {
            Some(draft) if draft.is_destroy() => Ok(EntityState::DestroyStaged),
            _ => Ok(EntityState::Persisted),
        }
    }

    fn schema_for(&self, entity: &Entity) -> std::result::Result<&EntitySchema, DraftError> {
        self.registry
            .get(entity.entity_type())
            .ok_or_else(|| DraftError::NotDraftable {
                entity_type: entity.entity_type().to_string(),
            })
    }

    fn run_save(
        &self,
        entity: &mut Entity,
        request: &RequestContext,
    ) -> std::result::Result<Draft, DraftError> {
        let schema = self.schema_for(entity)?;
        let entity_id = entity.id().to_string();

        let mut unit = self
            .repository
            .begin()
            .map_err(|source| DraftError::StorageUnavailable {
                entity_id: entity_id.clone(),
                source: correlate(source, request),
            })?;
        let operation = if unit
            .has_prior_identity(&entity_id)
            .map_err(|source| DraftError::Backend(correlate(source, request)))?
        {
            OperationType::Update
        } else {
            OperationType::Create
        };

        let run = Pipeline::new(schema.hooks()).execute(entity, operation, request, move |entity| {
            unit.persist(entity)
                .map_err(|source| DraftError::PersistenceFailure {
                    entity_id: entity.id().to_string(),
                    source: correlate(source.with_operation(operation), request),
                })?;
            let snapshot = codec::encode(entity, schema);
            let draft = unit
                .append(entity.id(), operation, snapshot)
                .map_err(|source| storage_unavailable(entity, operation, source, request))?;
            unit.commit()
                .map_err(|source| storage_unavailable(entity, operation, source, request))?;
            Ok(draft)
        })?;

        into_outcome(entity_id, run)
    }

    fn run_destruction(
        &self,
        entity: &mut Entity,
        request: &RequestContext,
    ) -> std::result::Result<Draft, DraftError> {
        let schema = self.schema_for(entity)?;
        let entity_id = entity.id().to_string();
        let operation = OperationType::Destroy;

        let mut unit = self
            .repository
            .begin()
            .map_err(|source| DraftError::StorageUnavailable {
                entity_id: entity_id.clone(),
                source: correlate(source, request),
            })?;
        let persisted = unit
            .load_attributes(&entity_id)
            .map_err(|source| DraftError::Backend(correlate(source, request)))?;
        let Some(persisted) = persisted else {
            return Err(DraftError::NotPersisted { entity_id });
        };
        let destroy_snapshot = self.destroy_snapshot;

        let run = Pipeline::new(schema.hooks()).execute(entity, operation, request, move |entity| {
            let snapshot = match destroy_snapshot {
                DestroySnapshot::InMemory => codec::encode(entity, schema),
                DestroySnapshot::Persisted => {
                    codec::encode_attributes(entity.entity_type(), &persisted, schema)
                }
            };
            let draft = unit
                .append(entity.id(), operation, snapshot)
                .map_err(|source| storage_unavailable(entity, operation, source, request))?;
            unit.commit()
                .map_err(|source| storage_unavailable(entity, operation, source, request))?;
            Ok(draft)
        })?;

        into_outcome(entity_id, run)
    }

    /// One start and one end or end_error event around a draft operation
    fn observed<F>(
        &self,
        op: &'static str,
        entity: &mut Entity,
        request: &RequestContext,
        body: F,
    ) -> std::result::Result<Draft, DraftError>
    where
        F: FnOnce(&mut Entity) -> std::result::Result<Draft, DraftError>,
    {
        let start = Instant::now();
        let entity_id = entity.id().to_string();
        log_op_start!(
            op,
            entity_id = entity_id.as_str(),
            entity_type = entity.entity_type(),
            request_id = request.request_id.as_str()
        );

        let result = body(entity);

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(draft) => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    entity_id = entity_id.as_str(),
                    operation = draft.operation().as_str(),
                    sequence = draft.sequence(),
                    request_id = request.request_id.as_str()
                );
            }
            Err(err) => {
                log_op_error!(
                    op,
                    err.clone(),
                    duration_ms = duration_ms,
                    entity_id = entity_id.as_str(),
                    committed = err.is_committed(),
                    request_id = request.request_id.as_str()
                );
            }
        }
        result
    }
}

fn correlate(err: ExError, request: &RequestContext) -> ExError {
    let err = err.with_request_id(request.request_id.clone());
    match &request.trace_id {
        Some(trace_id) => err.with_trace_id(trace_id.clone()),
        None => err,
    }
}

fn storage_unavailable(
    entity: &Entity,
    operation: OperationType,
    source: ExError,
    request: &RequestContext,
) -> DraftError {
    DraftError::StorageUnavailable {
        entity_id: entity.id().to_string(),
        source: correlate(source.with_operation(operation), request),
    }
}

fn into_outcome(
    entity_id: String,
    run: PipelineRun<Draft>,
) -> std::result::Result<Draft, DraftError> {
    match run.post_persist_failure {
        None => Ok(run.value),
        Some(failure) => Err(DraftError::PostPersistHookFailure {
            entity_id,
            phase: failure.phase,
            draft: Box::new(run.value),
            source: failure.source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{HookContext, HookPhase, HookResult};
    use crate::store::MemoryRepository;

    fn manager() -> DraftManager<MemoryRepository> {
        let schema = EntitySchema::new("note")
            .on(OperationType::Create, HookPhase::Before, |ctx: &mut HookContext<'_>| -> HookResult {
                ctx.set("title", "untitled");
                Ok(())
            })
            .unwrap();
        let mut registry = DraftRegistry::new();
        registry.register(schema).unwrap();
        DraftManager::new(MemoryRepository::new(), registry)
    }

    #[test]
    fn test_create_then_update() {
        let manager = manager();
        let mut entity = Entity::with_id("n1", "note");

        let first = manager.save_draft(&mut entity).unwrap();
        let second = manager.save_draft(&mut entity).unwrap();

        assert_eq!(first.operation(), OperationType::Create);
        assert_eq!(first.sequence(), 1);
        assert_eq!(second.operation(), OperationType::Update);
        assert_eq!(second.sequence(), 2);
    }

    #[test]
    fn test_unregistered_type_is_not_draftable() {
        let manager = manager();
        let mut entity = Entity::with_id("x1", "unknown");

        let err = manager.save_draft(&mut entity).unwrap_err();

        assert!(matches!(err, DraftError::NotDraftable { .. }));
        assert!(!manager.draftable("unknown"));
        assert!(manager.draftable("note"));
    }

    #[test]
    fn test_entity_state_transitions() {
        let manager = manager();
        let mut entity = Entity::with_id("n1", "note");
        assert_eq!(manager.entity_state(&entity).unwrap(), EntityState::New);

        manager.save_draft(&mut entity).unwrap();
        assert_eq!(manager.entity_state(&entity).unwrap(), EntityState::Persisted);

        manager.draft_destruction(&mut entity).unwrap();
        assert_eq!(manager.entity_state(&entity).unwrap(), EntityState::DestroyStaged);

        manager.save_draft(&mut entity).unwrap();
        assert_eq!(manager.entity_state(&entity).unwrap(), EntityState::Persisted);
    }

    #[test]
    fn test_reload_of_new_entity_is_not_found() {
        let manager = manager();
        let mut entity = Entity::with_id("n1", "note");
        let err = manager.reload(&mut entity).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }
}
