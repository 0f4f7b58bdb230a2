use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::operation::OperationType;
use crate::codec::Snapshot;
use crate::reify::{reify, ReifiedDraft};

/// Immutable record of an entity's attributes at a commit point
///
/// Drafts are only constructed by draft stores when appending; there are no
/// setters. `sequence` starts at 1 and increases by exactly one per entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    entity_id: String,
    operation: OperationType,
    sequence: u64,
    snapshot: Snapshot,
    created_at: DateTime<Utc>,
}

impl Draft {
    /// Assemble a draft from stored or freshly allocated parts
    pub fn new(
        entity_id: impl Into<String>,
        operation: OperationType,
        sequence: u64,
        snapshot: Snapshot,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            operation,
            sequence,
            snapshot,
            created_at,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn operation(&self) -> OperationType {
        self.operation
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_destroy(&self) -> bool {
        self.operation == OperationType::Destroy
    }

    /// Detached attribute view of this draft
    pub fn reify(&self) -> ReifiedDraft {
        reify(self)
    }
}
