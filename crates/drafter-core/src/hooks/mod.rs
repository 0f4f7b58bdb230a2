//! Lifecycle hooks around draft-producing operations
//!
//! For each operation the pipeline runs, in order:
//!
//! 1. BEFORE hooks (registration order)
//! 2. the pre half of AROUND hooks (registration order)
//! 3. PERSIST (entity write, snapshot, draft append, commit)
//! 4. the post half of AROUND hooks (reverse registration order)
//! 5. AFTER hooks (registration order)
//!
//! Steps 1 and 2 can veto the operation. Failures in 4 and 5 happen after
//! the commit and are surfaced as post-persist failures.

pub mod hook;
pub mod pipeline;
pub mod registry;

pub use hook::{Hook, HookContext, HookPhase, HookResult};
pub use pipeline::{Pipeline, PipelineRun, PostPersistFailure};
pub use registry::HookRegistry;
