//! Ordered execution of one lifecycle operation

use std::sync::Arc;

use super::hook::{Hook, HookContext, HookPhase};
use super::registry::HookRegistry;
use crate::core_types::RequestContext;
use crate::errors::{DraftError, ExError};
use crate::model::{Entity, OperationType};

/// A hook failure after PERSIST committed
#[derive(Debug, Clone)]
pub struct PostPersistFailure {
    pub phase: HookPhase,
    pub source: ExError,
}

/// Result of a pipeline run whose PERSIST step succeeded
#[derive(Debug)]
pub struct PipelineRun<T> {
    pub value: T,
    pub post_persist_failure: Option<PostPersistFailure>,
}

/// Runs BEFORE, AROUND_PRE, PERSIST, AROUND_POST, AFTER for one operation
pub struct Pipeline<'r> {
    hooks: &'r HookRegistry,
}

impl<'r> Pipeline<'r> {
    pub fn new(hooks: &'r HookRegistry) -> Self {
        Self { hooks }
    }

    /// Execute the pipeline with `persist` as the PERSIST step
    ///
    /// `persist` sees the entity after every pre-persist hook has run. When it
    /// fails, its error is returned unchanged and no post-persist hook runs.
    /// The first post-persist hook failure stops the remaining post-persist
    /// hooks and is reported in [`PipelineRun::post_persist_failure`].
    ///
    /// # Errors
    ///
    /// - `ValidationFailure` when a BEFORE or AROUND_PRE hook fails
    /// - whatever `persist` returns
    pub fn execute<T, F>(
        &self,
        entity: &mut Entity,
        operation: OperationType,
        request: &RequestContext,
        persist: F,
    ) -> Result<PipelineRun<T>, DraftError>
    where
        F: FnOnce(&Entity) -> Result<T, DraftError>,
    {
        for phase in [HookPhase::Before, HookPhase::AroundPre] {
            let hooks = self.hooks.hooks(operation, phase);
            self.trace_phase(entity, operation, phase, hooks.len());
            run_in_order(hooks.iter(), entity, operation, phase, request).map_err(|source| {
                DraftError::ValidationFailure {
                    entity_id: entity.id().to_string(),
                    operation,
                    phase,
                    source: annotate(source, entity, operation, phase, request),
                }
            })?;
        }

        self.trace_phase(entity, operation, HookPhase::Persist, 0);
        let value = persist(entity)?;

        let post_persist_failure = self.run_post_persist(entity, operation, request);
        Ok(PipelineRun {
            value,
            post_persist_failure,
        })
    }

    fn run_post_persist(
        &self,
        entity: &mut Entity,
        operation: OperationType,
        request: &RequestContext,
    ) -> Option<PostPersistFailure> {
        let around_post = self.hooks.hooks(operation, HookPhase::AroundPost);
        self.trace_phase(entity, operation, HookPhase::AroundPost, around_post.len());
        if let Err(source) = run_in_order(
            around_post.iter().rev(),
            entity,
            operation,
            HookPhase::AroundPost,
            request,
        ) {
            return Some(PostPersistFailure {
                phase: HookPhase::AroundPost,
                source: annotate(source, entity, operation, HookPhase::AroundPost, request),
            });
        }

        let after = self.hooks.hooks(operation, HookPhase::After);
        self.trace_phase(entity, operation, HookPhase::After, after.len());
        run_in_order(after.iter(), entity, operation, HookPhase::After, request)
            .err()
            .map(|source| PostPersistFailure {
                phase: HookPhase::After,
                source: annotate(source, entity, operation, HookPhase::After, request),
            })
    }

    fn trace_phase(
        &self,
        entity: &Entity,
        operation: OperationType,
        phase: HookPhase,
        hook_count: usize,
    ) {
        tracing::debug!(
            component = module_path!(),
            op = "hook_pipeline",
            entity_id = entity.id(),
            operation = operation.as_str(),
            phase = phase.as_str(),
            hook_count = hook_count,
        );
    }
}

fn run_in_order<'h>(
    hooks: impl Iterator<Item = &'h Arc<dyn Hook>>,
    entity: &mut Entity,
    operation: OperationType,
    phase: HookPhase,
    request: &RequestContext,
) -> Result<(), ExError> {
    for hook in hooks {
        let mut ctx = HookContext::new(entity, operation, phase, request);
        hook.call(&mut ctx)?;
    }
    Ok(())
}

fn annotate(
    source: ExError,
    entity: &Entity,
    operation: OperationType,
    phase: HookPhase,
    request: &RequestContext,
) -> ExError {
    let mut err = source
        .with_entity_id(entity.id())
        .with_operation(operation)
        .with_phase(phase)
        .with_request_id(request.request_id.clone());
    if let Some(trace_id) = &request.trace_id {
        err = err.with_trace_id(trace_id.clone());
    }
    err
}
