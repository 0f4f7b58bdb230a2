//! Snapshot schema versioning via upcasters.
//!
//! Stored snapshots are never rewritten; older encodings are lifted to the
//! current envelope on read.

use serde_json::{json, Value};

use super::snapshot::{CURRENT_SNAPSHOT_VERSION, SNAPSHOT_FORMAT};
use crate::errors::{ExError, ExErrorKind, Result};

/// Undecoded snapshot JSON plus its detected version
#[derive(Debug, Clone, PartialEq)]
pub struct RawSnapshot {
    pub version: u16,
    pub body: Value,
}

impl RawSnapshot {
    /// Classify stored JSON
    ///
    /// Objects carrying the envelope marker report their `version` (current
    /// when missing). Any other object is a version 0 flat attribute map.
    ///
    /// # Errors
    ///
    /// `Serialization` if `value` is not a JSON object.
    pub fn detect(value: Value) -> Result<Self> {
        let Value::Object(map) = &value else {
            return Err(ExError::new(ExErrorKind::Serialization)
                .with_op("decode_snapshot")
                .with_message("Snapshot must be a JSON object"));
        };

        let enveloped = map.get("format").and_then(Value::as_str) == Some(SNAPSHOT_FORMAT);
        let version = if enveloped {
            map.get("version")
                .and_then(Value::as_u64)
                .map(|v| u16::try_from(v).unwrap_or(u16::MAX))
                .unwrap_or(CURRENT_SNAPSHOT_VERSION)
        } else {
            0
        };

        Ok(Self {
            version,
            body: value,
        })
    }
}

/// Lifts a raw snapshot from one version to the next
pub trait SnapshotUpcaster: Send + Sync {
    fn can_upcast(&self, version: u16) -> bool;
    fn upcast(&self, raw: RawSnapshot) -> RawSnapshot;
}

/// Ordered upcasters applied on read
pub struct UpcasterRegistry {
    upcasters: Vec<Box<dyn SnapshotUpcaster>>,
}

impl UpcasterRegistry {
    pub fn new() -> Self {
        Self {
            upcasters: Vec::new(),
        }
    }

    /// Registry with the built-in legacy (version 0) upcaster
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LegacyFlatUpcaster));
        registry
    }

    pub fn register(&mut self, upcaster: Box<dyn SnapshotUpcaster>) {
        self.upcasters.push(upcaster);
    }

    /// Run every applicable upcaster in registration order
    pub fn upcast(&self, mut raw: RawSnapshot) -> RawSnapshot {
        if raw.version >= CURRENT_SNAPSHOT_VERSION {
            return raw;
        }
        for upcaster in &self.upcasters {
            if upcaster.can_upcast(raw.version) {
                raw = upcaster.upcast(raw);
            }
        }
        raw
    }
}

impl Default for UpcasterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Version 0: a bare attribute object with no envelope
struct LegacyFlatUpcaster;

impl SnapshotUpcaster for LegacyFlatUpcaster {
    fn can_upcast(&self, version: u16) -> bool {
        version == 0
    }

    fn upcast(&self, raw: RawSnapshot) -> RawSnapshot {
        RawSnapshot {
            version: 1,
            body: json!({
                "format": SNAPSHOT_FORMAT,
                "version": 1,
                "attributes": raw.body,
            }),
        }
    }
}
