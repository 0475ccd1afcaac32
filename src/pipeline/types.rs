//! Invocation states, reports and responses

use crate::error::{Error, ErrorKind};
use crate::load::LoadOutcome;
use crate::storage::ObjectLocation;
use crate::trigger::TriggerStatus;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Progress of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Extracted,
    Transformed,
    Loaded,
    TransformationTriggered,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Extracted => "extracted",
            Stage::Transformed => "transformed",
            Stage::Loaded => "loaded",
            Stage::TransformationTriggered => "transformation_triggered",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal state of an invocation
#[derive(Debug)]
pub enum InvocationState {
    Done,
    /// Aborted; `stage` is the last stage reached before the failure
    Failed { stage: Stage, error: Error },
}

/// Everything one invocation did
#[derive(Debug)]
pub struct InvocationReport {
    /// Objects named by the event
    pub objects: Vec<ObjectLocation>,
    /// One entry per completed load
    pub loads: Vec<LoadOutcome>,
    /// Transformation trigger result, when one was attempted
    pub trigger: Option<TriggerStatus>,
    /// Stages entered, in order (repeated per object for direct inserts)
    pub transitions: Vec<Stage>,
    pub state: InvocationState,
}

impl InvocationReport {
    pub(crate) fn received() -> Self {
        Self {
            objects: Vec::new(),
            loads: Vec::new(),
            trigger: None,
            transitions: vec![Stage::Received],
            state: InvocationState::Done,
        }
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        self.transitions.push(stage);
    }

    /// Last stage entered
    pub fn stage(&self) -> Stage {
        self.transitions.last().copied().unwrap_or(Stage::Received)
    }

    pub(crate) fn fail(mut self, error: Error) -> Self {
        self.state = InvocationState::Failed {
            stage: self.stage(),
            error,
        };
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.state, InvocationState::Done)
    }

    /// Failure category, if the invocation failed
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.state {
            InvocationState::Failed { ref error, .. } => Some(error.kind()),
            InvocationState::Done => None,
        }
    }

    /// Rows loaded across all loads
    pub fn rows_loaded(&self) -> u64 {
        self.loads.iter().map(|l| l.rows_loaded).sum()
    }

    /// Convert into the function response
    pub fn to_response(&self) -> InvocationResponse {
        match self.state {
            InvocationState::Done => {
                let objects: Vec<String> = self.objects.iter().map(ToString::to_string).collect();
                let message = if objects.is_empty() {
                    "No objects to process".to_string()
                } else if let Some(load) = self.loads.first() {
                    format!("Processed and loaded {} into {}", objects.join(", "), load.table)
                } else {
                    format!("Processed {}", objects.join(", "))
                };
                InvocationResponse::new(
                    200,
                    &json!({
                        "message": message,
                        "objects": objects,
                        "rows_loaded": self.rows_loaded(),
                    }),
                )
            }
            InvocationState::Failed { stage, ref error } => InvocationResponse::new(
                500,
                &json!({
                    "error": error.to_string(),
                    "kind": error.kind(),
                    "stage": stage,
                }),
            ),
        }
    }
}

/// Function response: status code plus a JSON-encoded body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    fn new(status_code: u16, body: &serde_json::Value) -> Self {
        Self {
            status_code,
            body: body.to_string(),
        }
    }

    /// Parsed body
    pub fn body_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}
