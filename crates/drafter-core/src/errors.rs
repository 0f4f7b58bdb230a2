use drafter_core_types::{RequestId, TraceId};
use thiserror::Error;

use crate::hooks::HookPhase;
use crate::model::{Draft, OperationType};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on in tests,
/// logs and external responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Pipeline outcomes
    ValidationFailure,
    PersistenceFailure,
    StorageUnavailable,
    PostPersistHookFailure,

    // Registration / lookup
    NotDraftable,
    NotPersisted,
    NotFound,
    AlreadyExists,
    InvalidInput,

    // Snapshot codec
    Serialization,
    UnsupportedSnapshot,
    IntegrityViolation,

    // Integration/IO
    Persistence,
    Io,
    Config,
    Concurrency,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::ValidationFailure => "ERR_VALIDATION_FAILURE",
            ExErrorKind::PersistenceFailure => "ERR_PERSISTENCE_FAILURE",
            ExErrorKind::StorageUnavailable => "ERR_STORAGE_UNAVAILABLE",
            ExErrorKind::PostPersistHookFailure => "ERR_POST_PERSIST_HOOK_FAILURE",
            ExErrorKind::NotDraftable => "ERR_NOT_DRAFTABLE",
            ExErrorKind::NotPersisted => "ERR_NOT_PERSISTED",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::UnsupportedSnapshot => "ERR_UNSUPPORTED_SNAPSHOT",
            ExErrorKind::IntegrityViolation => "ERR_INTEGRITY_VIOLATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus optional context (operation name,
/// entity, draft operation, hook phase, correlation ids) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    operation: Option<OperationType>,
    phase: Option<HookPhase>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            operation: None,
            phase: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Shorthand for a hook rejecting the operation
    ///
    /// ```
    /// use drafter_core::errors::{ExError, ExErrorKind};
    ///
    /// let err = ExError::rejected("comment must not be empty");
    /// assert_eq!(err.kind(), ExErrorKind::ValidationFailure);
    /// ```
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ExErrorKind::ValidationFailure).with_message(message)
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add draft operation context
    pub fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Add hook phase context
    pub fn with_phase(mut self, phase: HookPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn operation(&self) -> Option<OperationType> {
        self.operation
    }

    pub fn phase(&self) -> Option<HookPhase> {
        self.phase
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(operation) = self.operation {
            write!(f, " (operation: {})", operation)?;
        }
        if let Some(phase) = self.phase {
            write!(f, " (phase: {})", phase)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}

// ========== End Error Facility ==========

/// Outcome taxonomy of a draft manager call
///
/// Everything except `PostPersistHookFailure` means the operation was not
/// committed: no entity write and no Draft exist for it.
#[derive(Error, Debug, Clone)]
pub enum DraftError {
    /// A BEFORE or AROUND_PRE hook rejected the operation
    #[error("{operation} of entity {entity_id} rejected during {phase}: {source}")]
    ValidationFailure {
        entity_id: String,
        operation: OperationType,
        phase: HookPhase,
        source: ExError,
    },

    /// The persistence collaborator rejected the entity write
    #[error("entity {entity_id} could not be persisted: {source}")]
    PersistenceFailure { entity_id: String, source: ExError },

    /// The draft store rejected the append (or the unit of work could not commit)
    #[error("draft store unavailable for entity {entity_id}: {source}")]
    StorageUnavailable { entity_id: String, source: ExError },

    /// An AROUND_POST or AFTER hook failed after the draft was committed
    #[error("{phase} hook failed after entity {entity_id} was committed: {source}")]
    PostPersistHookFailure {
        entity_id: String,
        phase: HookPhase,
        draft: Box<Draft>,
        source: ExError,
    },

    /// The entity type was never registered with the draft registry
    #[error("entity type is not draftable: {entity_type}")]
    NotDraftable { entity_type: String },

    /// The operation requires an entity that has been persisted before
    #[error("entity {entity_id} has no persisted identity")]
    NotPersisted { entity_id: String },

    /// Reading from the repository failed outside the PERSIST step
    #[error("repository read failed: {0}")]
    Backend(ExError),
}

impl DraftError {
    /// True when PERSIST already committed, i.e. the Draft exists durably
    pub fn is_committed(&self) -> bool {
        matches!(self, DraftError::PostPersistHookFailure { .. })
    }

    /// The Draft committed before a post-persist hook failed, if any
    pub fn committed_draft(&self) -> Option<&Draft> {
        match self {
            DraftError::PostPersistHookFailure { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn kind(&self) -> ExErrorKind {
        match self {
            DraftError::ValidationFailure { .. } => ExErrorKind::ValidationFailure,
            DraftError::PersistenceFailure { .. } => ExErrorKind::PersistenceFailure,
            DraftError::StorageUnavailable { .. } => ExErrorKind::StorageUnavailable,
            DraftError::PostPersistHookFailure { .. } => ExErrorKind::PostPersistHookFailure,
            DraftError::NotDraftable { .. } => ExErrorKind::NotDraftable,
            DraftError::NotPersisted { .. } => ExErrorKind::NotPersisted,
            DraftError::Backend(source) => source.kind(),
        }
    }
}

impl From<DraftError> for ExError {
    fn from(err: DraftError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            DraftError::ValidationFailure {
                entity_id,
                operation,
                phase,
                source,
            } => ExError::new(kind)
                .with_entity_id(entity_id)
                .with_operation(operation)
                .with_phase(phase)
                .with_message(message)
                .with_source(source),
            DraftError::PersistenceFailure { entity_id, source }
            | DraftError::StorageUnavailable { entity_id, source } => ExError::new(kind)
                .with_entity_id(entity_id)
                .with_message(message)
                .with_source(source),
            DraftError::PostPersistHookFailure {
                entity_id,
                phase,
                draft,
                source,
            } => ExError::new(kind)
                .with_entity_id(entity_id)
                .with_operation(draft.operation())
                .with_phase(phase)
                .with_message(message)
                .with_source(source),
            DraftError::NotDraftable { .. } => ExError::new(kind).with_message(message),
            DraftError::NotPersisted { entity_id } => ExError::new(kind)
                .with_entity_id(entity_id)
                .with_message(message),
            DraftError::Backend(source) => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let kinds = [
            ExErrorKind::ValidationFailure,
            ExErrorKind::PersistenceFailure,
            ExErrorKind::StorageUnavailable,
            ExErrorKind::PostPersistHookFailure,
            ExErrorKind::NotDraftable,
            ExErrorKind::NotPersisted,
            ExErrorKind::NotFound,
            ExErrorKind::AlreadyExists,
            ExErrorKind::InvalidInput,
            ExErrorKind::Serialization,
            ExErrorKind::UnsupportedSnapshot,
            ExErrorKind::IntegrityViolation,
            ExErrorKind::Persistence,
            ExErrorKind::Io,
            ExErrorKind::Config,
            ExErrorKind::Concurrency,
            ExErrorKind::Internal,
        ];
        let codes: std::collections::HashSet<_> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::NotFound)
            .with_op("reload")
            .with_entity_id("e1")
            .with_message("no persisted row");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_NOT_FOUND]"));
        assert!(rendered.contains("in operation 'reload'"));
        assert!(rendered.contains("(entity_id: e1)"));
    }

    #[test]
    fn test_source_chain_is_exposed() {
        use std::error::Error;

        let inner = ExError::new(ExErrorKind::Persistence).with_message("disk full");
        let outer = ExError::new(ExErrorKind::StorageUnavailable).with_source(inner);
        let source = outer.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("disk full"));
    }

    #[test]
    fn test_uncommitted_errors_carry_no_draft() {
        let err = DraftError::PersistenceFailure {
            entity_id: "e1".to_string(),
            source: ExError::new(ExErrorKind::Persistence),
        };
        assert!(!err.is_committed());
        assert!(err.committed_draft().is_none());
        assert_eq!(err.kind(), ExErrorKind::PersistenceFailure);
    }
}
