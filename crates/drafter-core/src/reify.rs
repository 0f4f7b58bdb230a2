//! Reconstruct the captured state of a draft.
//!
//! A reified draft is a detached read-only view: nothing it exposes is tied
//! to a live entity, and no reification ever touches storage.

use chrono::{DateTime, Utc};

use crate::codec;
use crate::model::{AttributeMap, AttributeValue, Draft, OperationType};
use crate::schema::EntitySchema;

#[derive(Debug, Clone, PartialEq)]
pub struct ReifiedDraft {
    entity_id: String,
    entity_type: String,
    operation: OperationType,
    sequence: u64,
    created_at: DateTime<Utc>,
    attributes: AttributeMap,
}

impl ReifiedDraft {
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn operation(&self) -> OperationType {
        self.operation
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn into_attributes(self) -> AttributeMap {
        self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_str())
    }
}

/// Decode a draft's snapshot into a detached attribute view
pub fn reify(draft: &Draft) -> ReifiedDraft {
    let snapshot = draft.snapshot();
    ReifiedDraft {
        entity_id: draft.entity_id().to_string(),
        entity_type: snapshot.entity_type().to_string(),
        operation: draft.operation(),
        sequence: draft.sequence(),
        created_at: draft.created_at(),
        attributes: codec::decode(snapshot),
    }
}

/// Reify against the entity's current schema
///
/// Attributes the schema no longer declares are dropped. Declared
/// attributes missing from an older snapshot stay absent.
pub fn reify_with_schema(draft: &Draft, schema: &EntitySchema) -> ReifiedDraft {
    let mut reified = reify(draft);
    reified.attributes.retain(|name, _| schema.declares(name));
    reified
}
