//! Post-load and pre-load triggers
//!
//! - [`TransformTrigger`] runs the downstream transformation tool (dbt by
//!   default) after a successful load, subject to a [`TriggerFailurePolicy`]
//! - [`LoadTrigger`] invokes the pipeline function directly, e.g. after
//!   seeding data, and never fails its caller
//!
//! [`TriggerFailurePolicy`]: crate::types::TriggerFailurePolicy

mod invoke;
mod process;

pub use invoke::{AwsLambdaInvoker, FunctionInvoker, InvokeOutcome, LoadTrigger, RecordingInvoker};
pub use process::{
    ProcessOutcome, ProcessRunner, ProcessSpec, RecordingProcessRunner, TokioProcessRunner,
    TransformTrigger, TriggerStatus,
};
