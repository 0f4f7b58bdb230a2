//! Attribute snapshot codec
//!
//! `encode` deep-copies an entity's declared attributes into an immutable,
//! self-versioned [`Snapshot`]; `decode` is the pure inverse. Later mutation
//! of the entity never reaches an already produced snapshot because values
//! are cloned, not shared.
//!
//! The JSON form is an envelope:
//!
//! ```json
//! {"format":"drafter.snapshot","version":1,"entity_type":"talkative",
//!  "attributes":{"before_comment":"..."},"digest":"<sha256 hex>"}
//! ```
//!
//! Older encodings are upcast on read (see [`upcast`]); unknown envelope
//! fields are ignored and missing ones default, so schema drift never fails
//! a decode.

pub mod snapshot;
pub mod upcast;

pub use snapshot::{compute_digest, Snapshot, CURRENT_SNAPSHOT_VERSION, SNAPSHOT_FORMAT};
pub use upcast::{RawSnapshot, SnapshotUpcaster, UpcasterRegistry};

use crate::errors::Result;
use crate::model::{AttributeMap, Entity};
use crate::schema::EntitySchema;

/// Capture the entity's declared attributes as they stand right now
pub fn encode(entity: &Entity, schema: &EntitySchema) -> Snapshot {
    encode_attributes(entity.entity_type(), entity.attributes(), schema)
}

/// Capture an arbitrary attribute map under an entity type
pub fn encode_attributes(
    entity_type: &str,
    attributes: &AttributeMap,
    schema: &EntitySchema,
) -> Snapshot {
    let captured: AttributeMap = attributes
        .iter()
        .filter(|(name, _)| schema.declares(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    Snapshot::new(entity_type, captured)
}

/// Reconstruct the attribute map held by a snapshot
pub fn decode(snapshot: &Snapshot) -> AttributeMap {
    snapshot.attributes().clone()
}

/// Decode stored snapshot JSON, upcasting older versions
pub fn decode_json(json: &str) -> Result<AttributeMap> {
    Ok(Snapshot::from_json(json)?.into_attributes())
}
