//! Versioned snapshot envelope and digest computation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::upcast::{RawSnapshot, UpcasterRegistry};
use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{AttributeMap, AttributeValue};

/// Envelope marker distinguishing current snapshots from legacy flat objects
pub const SNAPSHOT_FORMAT: &str = "drafter.snapshot";

/// Version written by this build
pub const CURRENT_SNAPSHOT_VERSION: u16 = 1;

fn default_format() -> String {
    SNAPSHOT_FORMAT.to_string()
}

fn default_version() -> u16 {
    CURRENT_SNAPSHOT_VERSION
}

/// Immutable, self-describing capture of an entity's attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_format")]
    format: String,
    #[serde(default = "default_version")]
    version: u16,
    #[serde(default)]
    entity_type: String,
    #[serde(default)]
    attributes: AttributeMap,
    #[serde(default)]
    digest: String,
}

impl Snapshot {
    /// Build a current-version snapshot and compute its digest
    pub fn new(entity_type: impl Into<String>, attributes: AttributeMap) -> Self {
        let digest = compute_digest(&attributes);
        Self {
            format: default_format(),
            version: CURRENT_SNAPSHOT_VERSION,
            entity_type: entity_type.into(),
            attributes,
            digest,
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
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

    /// SHA-256 (hex) of the canonical attribute encoding
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// True when the recorded digest matches the attributes
    pub fn verify(&self) -> bool {
        compute_digest(&self.attributes) == self.digest
    }

    /// Serialize to the stable JSON envelope
    ///
    /// # Errors
    ///
    /// `Serialization` if the attribute values cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("encode_snapshot")
                .with_message(e.to_string())
        })
    }

    /// Parse stored JSON with the default upcasters
    ///
    /// # Errors
    ///
    /// See [`Snapshot::from_json_with`].
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with(json, &UpcasterRegistry::with_defaults())
    }

    /// Parse stored JSON, upcasting older versions through `upcasters`
    ///
    /// # Errors
    ///
    /// - `Serialization`: not JSON, not an object, or malformed attributes
    /// - `UnsupportedSnapshot`: written by a newer version than this build reads
    pub fn from_json_with(json: &str, upcasters: &UpcasterRegistry) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("decode_snapshot")
                .with_message(format!("Snapshot is not valid JSON: {}", e))
        })?;

        let raw = RawSnapshot::detect(value)?;
        if raw.version > CURRENT_SNAPSHOT_VERSION {
            return Err(ExError::new(ExErrorKind::UnsupportedSnapshot)
                .with_op("decode_snapshot")
                .with_message(format!(
                    "Snapshot version {} is newer than supported version {}",
                    raw.version, CURRENT_SNAPSHOT_VERSION
                )));
        }

        let raw = upcasters.upcast(raw);
        let mut snapshot: Snapshot = serde_json::from_value(raw.body).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("decode_snapshot")
                .with_message(format!("Malformed snapshot envelope: {}", e))
        })?;
        snapshot.version = CURRENT_SNAPSHOT_VERSION;
        if snapshot.digest.is_empty() {
            snapshot.digest = compute_digest(&snapshot.attributes);
        }
        Ok(snapshot)
    }
}

/// Digest of an attribute map
///
/// Keys are ordered (BTreeMap), so equal maps always hash identically.
pub fn compute_digest(attributes: &AttributeMap) -> String {
    let canonical = serde_json::to_vec(attributes).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}
