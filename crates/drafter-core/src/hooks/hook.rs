use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core_types::{RequestContext, RequestId};
use crate::errors::ExError;
use crate::model::{AttributeValue, Entity, OperationType};

/// Position of a step in the lifecycle pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    Before,
    AroundPre,
    Persist,
    AroundPost,
    After,
}

impl HookPhase {
    /// Execution order
    pub const ORDER: [HookPhase; 5] = [
        HookPhase::Before,
        HookPhase::AroundPre,
        HookPhase::Persist,
        HookPhase::AroundPost,
        HookPhase::After,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Before => "before",
            HookPhase::AroundPre => "around_pre",
            HookPhase::Persist => "persist",
            HookPhase::AroundPost => "around_post",
            HookPhase::After => "after",
        }
    }

    /// Phases whose failure vetoes the operation
    pub fn is_pre_persist(&self) -> bool {
        matches!(self, HookPhase::Before | HookPhase::AroundPre)
    }

    /// Phases that take single hooks
    ///
    /// Around halves are only registered as pairs; persist is the manager's.
    pub fn is_registrable(&self) -> bool {
        matches!(self, HookPhase::Before | HookPhase::After)
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook sees while it runs
///
/// Hooks may read and mutate the entity's in-memory attributes. They must not
/// call back into the draft manager: the unit of work for the operation is
/// already open.
pub struct HookContext<'a> {
    entity: &'a mut Entity,
    operation: OperationType,
    phase: HookPhase,
    request: &'a RequestContext,
}

impl<'a> HookContext<'a> {
    pub fn new(
        entity: &'a mut Entity,
        operation: OperationType,
        phase: HookPhase,
        request: &'a RequestContext,
    ) -> Self {
        Self {
            entity,
            operation,
            phase,
            request,
        }
    }

    pub fn entity(&self) -> &Entity {
        self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        self.entity
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entity.get(name)
    }

    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.entity.set(name, value)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.entity.remove(name)
    }

    pub fn operation(&self) -> OperationType {
        self.operation
    }

    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request.request_id
    }

    pub fn request(&self) -> &RequestContext {
        self.request
    }
}

pub type HookResult = std::result::Result<(), ExError>;

/// A lifecycle callback
///
/// Returning `Err` from a BEFORE or AROUND_PRE hook aborts the operation
/// with nothing written. Any closure of the right shape is a hook.
///
/// # Example
/// ```
/// use drafter_core::hooks::{Hook, HookContext, HookResult};
///
/// struct Stamp;
///
/// impl Hook for Stamp {
///     fn call(&self, ctx: &mut HookContext<'_>) -> HookResult {
///         let label = format!("{} via {}", ctx.operation(), ctx.phase());
///         ctx.set("stamp", label);
///         Ok(())
///     }
/// }
/// ```
pub trait Hook: Send + Sync {
    fn call(&self, ctx: &mut HookContext<'_>) -> HookResult;
}

impl<F> Hook for F
where
    F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync,
{
    fn call(&self, ctx: &mut HookContext<'_>) -> HookResult {
        self(ctx)
    }
}
