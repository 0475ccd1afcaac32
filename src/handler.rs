//! Serverless function entry point

use crate::error::{Error, Result};
use crate::extract::NotificationEvent;
use crate::pipeline::{InvocationResponse, Pipeline};
use lambda_runtime::{service_fn, LambdaEvent};
use std::sync::Arc;
use tracing::info;

/// Serve notification events until the runtime shuts the function down
pub async fn run(pipeline: Arc<Pipeline>) -> Result<()> {
    info!("Starting Lambda runtime");
    lambda_runtime::run(service_fn(move |event: LambdaEvent<NotificationEvent>| {
        let pipeline = Arc::clone(&pipeline);
        async move { handle(&pipeline, event).await }
    }))
    .await
    .map_err(|e| Error::Other(format!("Lambda runtime failed: {e}")))
}

/// Handle one runtime event
///
/// Pipeline failures become a 500 response rather than a runtime error, so
/// the caller always receives a structured body.
pub async fn handle(
    pipeline: &Pipeline,
    event: LambdaEvent<NotificationEvent>,
) -> std::result::Result<InvocationResponse, lambda_runtime::Error> {
    info!(request_id = %event.context.request_id, "Handling invocation");
    Ok(pipeline.handle(&event.payload).await)
}
