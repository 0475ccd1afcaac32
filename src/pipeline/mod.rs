//! Invocation pipeline
//!
//! One invocation walks a linear state machine:
//!
//! ```text
//! Received → Extracted → Transformed → Loaded → [TransformationTriggered] → Done
//! ```
//!
//! Any failure moves straight to `Failed` and skips the remaining stages.
//! Nothing is retried and nothing is persisted between invocations. With the
//! staged-copy strategy the warehouse reads the files itself, so the
//! extract and transform stages are skipped.

mod runner;
mod types;

pub use runner::Pipeline;
pub use types::{InvocationReport, InvocationResponse, InvocationState, Stage};
