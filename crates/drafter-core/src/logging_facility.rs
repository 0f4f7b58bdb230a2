//! Structured logging for drafter
//!
//! Draft manager calls (`save_draft`, `draft_destruction`, `reload`) each
//! emit one `start` and one `end` or `end_error` event carrying `entity_id`.
//! Draft-producing calls add `request_id`. Pipeline phases and store writes
//! log at debug.
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use drafter_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
