//! Schema migrations
//!
//! Embedded SQL applied in order, recorded with a SHA-256 checksum in
//! `schema_version`. Re-running is a no-op; an applied migration whose SQL
//! has since changed is reported instead of silently skipped.

mod checksums;
mod embedded;
mod runner;

pub use embedded::{get_migrations, Migration};
pub use runner::{applied_migrations, apply_migrations};
