//! Load trigger: invokes the pipeline function programmatically

use crate::error::{Error, Result};
use crate::types::InvocationMode;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Result of one function invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvokeOutcome {
    pub function: String,
    pub status_code: i32,
    /// Response payload (request/response invocations only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Invokes a named function
#[async_trait]
pub trait FunctionInvoker: Send + Sync + std::fmt::Debug {
    async fn invoke(
        &self,
        function: &str,
        mode: InvocationMode,
        payload: Option<&[u8]>,
    ) -> Result<InvokeOutcome>;
}

// ============================================================================
// AWS Lambda
// ============================================================================

/// AWS Lambda `Invoke`
#[derive(Debug, Clone)]
pub struct AwsLambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl AwsLambdaInvoker {
    /// Client from the default AWS environment
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(aws_sdk_lambda::Client::new(&config))
    }

    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionInvoker for AwsLambdaInvoker {
    async fn invoke(
        &self,
        function: &str,
        mode: InvocationMode,
        payload: Option<&[u8]>,
    ) -> Result<InvokeOutcome> {
        let invocation_type = match mode {
            InvocationMode::Event => InvocationType::Event,
            InvocationMode::RequestResponse => InvocationType::RequestResponse,
        };

        let mut request = self
            .client
            .invoke()
            .function_name(function)
            .invocation_type(invocation_type);
        if let Some(body) = payload {
            request = request.payload(Blob::new(body.to_vec()));
        }

        let output = request
            .send()
            .await
            .map_err(|e| Error::load_trigger(function, e.to_string()))?;

        if let Some(err) = output.function_error() {
            return Err(Error::load_trigger(function, format!("function error: {err}")));
        }
        let status_code = output.status_code();
        if !(200..300).contains(&status_code) {
            return Err(Error::load_trigger(
                function,
                format!("unexpected status {status_code}"),
            ));
        }

        Ok(InvokeOutcome {
            function: function.to_string(),
            status_code,
            payload: output
                .payload()
                .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned()),
        })
    }
}

// ============================================================================
// Recording invoker
// ============================================================================

/// Records invocations; optionally fails every one
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<(String, InvocationMode)>>,
    failure: Option<String>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoker whose every call fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: Mutex::default(),
            failure: Some(message.into()),
        }
    }

    pub fn calls(&self) -> Vec<(String, InvocationMode)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FunctionInvoker for RecordingInvoker {
    async fn invoke(
        &self,
        function: &str,
        mode: InvocationMode,
        _payload: Option<&[u8]>,
    ) -> Result<InvokeOutcome> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((function.to_string(), mode));
        }
        if let Some(ref message) = self.failure {
            return Err(Error::load_trigger(function, message.clone()));
        }
        Ok(InvokeOutcome {
            function: function.to_string(),
            status_code: match mode {
                InvocationMode::Event => 202,
                InvocationMode::RequestResponse => 200,
            },
            payload: None,
        })
    }
}

// ============================================================================
// Trigger
// ============================================================================

/// Fires the pipeline function without ever failing the caller
#[derive(Debug, Clone)]
pub struct LoadTrigger {
    invoker: Arc<dyn FunctionInvoker>,
    mode: InvocationMode,
}

impl LoadTrigger {
    pub fn new(invoker: Arc<dyn FunctionInvoker>, mode: InvocationMode) -> Self {
        Self { invoker, mode }
    }

    /// Invoke `function` with an empty payload
    ///
    /// Failures are logged and swallowed; `None` means the invocation failed.
    pub async fn fire(&self, function: &str) -> Option<InvokeOutcome> {
        match self.invoker.invoke(function, self.mode, None).await {
            Ok(outcome) => {
                info!(function = %function, status = outcome.status_code, "Invoked function");
                Some(outcome)
            }
            Err(e) => {
                warn!(function = %function, error = %e, "Function invocation failed");
                None
            }
        }
    }
}
