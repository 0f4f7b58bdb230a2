//! Error helpers for drafter-store
//!
//! Every store failure is an `ExError`; these build the common shapes.

use drafter_core::errors::{ExError, ExErrorKind};

pub type Result<T> = std::result::Result<T, ExError>;

pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::IntegrityViolation)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// A stored row that no longer decodes into a domain value
pub fn corrupt_row(op: &str, entity_id: &str, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::IntegrityViolation)
        .with_op(op)
        .with_entity_id(entity_id)
        .with_message(format!("Corrupt row: {}", reason))
}

