//! Transformation trigger: runs an external tool after a successful load

use crate::config::TransformTriggerConfig;
use crate::error::{Error, Result};
use crate::types::TriggerFailurePolicy;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// A command line to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl ProcessSpec {
    /// Create a spec without arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    /// Program and arguments joined for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes processes
#[async_trait]
pub trait ProcessRunner: Send + Sync + std::fmt::Debug {
    /// Run to completion, capturing output; fails only if the process cannot start
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutcome>;
}

/// Spawns real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutcome> {
        let mut command = tokio::process::Command::new(&spec.program);
        command.args(&spec.args).envs(&spec.env).kill_on_drop(true);
        if let Some(ref dir) = spec.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| {
            Error::transform_trigger(spec.command_line(), format!("failed to start: {e}"))
        })?;

        Ok(ProcessOutcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Replays canned outcomes and records every spec it was asked to run
#[derive(Debug, Default)]
pub struct RecordingProcessRunner {
    outcomes: Mutex<Vec<Result<ProcessOutcome>>>,
    runs: Mutex<Vec<ProcessSpec>>,
}

impl RecordingProcessRunner {
    /// Runner whose every run exits with `code`
    pub fn exiting(code: i32) -> Self {
        let runner = Self::default();
        runner.push(Ok(ProcessOutcome {
            code: Some(code),
            stdout: String::new(),
            stderr: if code == 0 {
                String::new()
            } else {
                format!("exit status {code}")
            },
        }));
        runner
    }

    /// Queue an outcome; the last queued outcome is reused once the queue drains
    pub fn push(&self, outcome: Result<ProcessOutcome>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome);
        }
    }

    /// Specs run so far
    pub fn runs(&self) -> Vec<ProcessSpec> {
        self.runs.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ProcessRunner for RecordingProcessRunner {
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutcome> {
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(spec.clone());
        }
        let mut outcomes = self
            .outcomes
            .lock()
            .map_err(|_| Error::Other("process outcome queue poisoned".to_string()))?;
        match outcomes.len() {
            0 => Ok(ProcessOutcome {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            }),
            1 => match outcomes[0] {
                Ok(ref outcome) => Ok(outcome.clone()),
                Err(ref e) => Err(Error::transform_trigger(spec.command_line(), e.to_string())),
            },
            _ => outcomes.remove(0),
        }
    }
}

// ============================================================================
// Trigger
// ============================================================================

/// What a trigger run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerStatus {
    /// Trigger disabled in the config
    Skipped,
    /// Tool ran and exited zero
    Succeeded,
    /// Tool failed and the failure policy let the invocation continue
    FailedIgnored { message: String },
}

/// Runs the configured transformation tool
#[derive(Debug, Clone)]
pub struct TransformTrigger {
    spec: Option<ProcessSpec>,
    policy: TriggerFailurePolicy,
    runner: Arc<dyn ProcessRunner>,
}

impl TransformTrigger {
    /// Build from the config; a disabled trigger never runs anything
    pub fn from_config(config: &TransformTriggerConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let spec = config.enabled.then(|| ProcessSpec {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            env: HashMap::new(),
        });
        Self {
            spec,
            policy: config.on_failure,
            runner,
        }
    }

    /// A trigger that never runs
    pub fn disabled() -> Self {
        Self {
            spec: None,
            policy: TriggerFailurePolicy::Continue,
            runner: Arc::new(TokioProcessRunner),
        }
    }

    /// Pass extra environment to the tool (e.g. resolved warehouse credentials)
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        if let Some(ref mut spec) = self.spec {
            spec.env.extend(env);
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.spec.is_some()
    }

    pub fn policy(&self) -> TriggerFailurePolicy {
        self.policy
    }

    /// Run the tool, applying the failure policy
    ///
    /// `extra_env` is layered over the configured environment for this run.
    pub async fn run(&self, extra_env: &HashMap<String, String>) -> Result<TriggerStatus> {
        let Some(ref base) = self.spec else {
            return Ok(TriggerStatus::Skipped);
        };
        let mut spec = base.clone();
        spec.env
            .extend(extra_env.iter().map(|(k, v)| (k.clone(), v.clone())));
        let command = spec.command_line();

        info!(command = %command, "Running transformation trigger");
        let failure = match self.runner.run(&spec).await {
            Ok(outcome) if outcome.success() => {
                info!(command = %command, stdout = %outcome.stdout.trim_end(), "Transformation trigger succeeded");
                return Ok(TriggerStatus::Succeeded);
            }
            Ok(outcome) => {
                let code = outcome
                    .code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                format!("exit code {code}: {}", outcome.stderr.trim())
            }
            Err(e) if self.policy == TriggerFailurePolicy::Fail => return Err(e),
            Err(e) => e.to_string(),
        };

        match self.policy {
            TriggerFailurePolicy::Continue => {
                warn!(command = %command, error = %failure, "Transformation trigger failed, continuing");
                Ok(TriggerStatus::FailedIgnored { message: failure })
            }
            TriggerFailurePolicy::Fail => Err(Error::transform_trigger(command, failure)),
        }
    }
}
