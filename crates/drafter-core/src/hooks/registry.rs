use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::hook::{Hook, HookPhase};
use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::OperationType;

/// Hooks per (operation, phase), kept in registration order
///
/// Cloning shares the hook instances.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<(OperationType, HookPhase), Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to the list for `(operation, phase)`
    ///
    /// # Errors
    ///
    /// `InvalidInput` for `HookPhase::Persist`, which is the manager's own
    /// step, and for either around half, which [`HookRegistry::register_around`]
    /// adds as a pair.
    pub fn register_hook(
        &mut self,
        operation: OperationType,
        phase: HookPhase,
        hook: impl Hook + 'static,
    ) -> Result<()> {
        if !phase.is_registrable() {
            let message = match phase {
                HookPhase::Persist => "The persist step cannot carry hooks",
                _ => "Around hooks are registered as pre/post pairs with register_around",
            };
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("register_hook")
                .with_operation(operation)
                .with_phase(phase)
                .with_message(message));
        }
        self.hooks
            .entry((operation, phase))
            .or_default()
            .push(Arc::new(hook));
        Ok(())
    }

    /// Register both halves of an around hook
    ///
    /// `pre` runs before persist in registration order, `post` after persist
    /// in reverse registration order, so the first around hook registered
    /// wraps all later ones.
    pub fn register_around(
        &mut self,
        operation: OperationType,
        pre: impl Hook + 'static,
        post: impl Hook + 'static,
    ) {
        self.hooks
            .entry((operation, HookPhase::AroundPre))
            .or_default()
            .push(Arc::new(pre));
        self.hooks
            .entry((operation, HookPhase::AroundPost))
            .or_default()
            .push(Arc::new(post));
    }

    /// Hooks for `(operation, phase)` in registration order
    pub fn hooks(&self, operation: OperationType, phase: HookPhase) -> &[Arc<dyn Hook>] {
        self.hooks
            .get(&(operation, phase))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, operation: OperationType, phase: HookPhase) -> usize {
        self.hooks(operation, phase).len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self
            .hooks
            .iter()
            .map(|((op, phase), hooks)| (format!("{}:{}", op, phase), hooks.len()))
            .collect();
        counts.sort();
        f.debug_struct("HookRegistry").field("hooks", &counts).finish()
    }
}
