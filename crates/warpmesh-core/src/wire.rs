//! JSON bodies exchanged between nodes and with submitting callers.

use serde::{Deserialize, Serialize};

use crate::types::{ExecutionFailure, NodeId, TaskOutput};

/// Reply of the task-execution endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionReply {
    Success { output: TaskOutput },
    Failure { error: ExecutionFailure },
}

impl From<Result<TaskOutput, ExecutionFailure>> for ExecutionReply {
    fn from(result: Result<TaskOutput, ExecutionFailure>) -> Self {
        match result {
            Ok(output) => ExecutionReply::Success { output },
            Err(error) => ExecutionReply::Failure { error },
        }
    }
}

impl From<ExecutionReply> for Result<TaskOutput, ExecutionFailure> {
    fn from(reply: ExecutionReply) -> Self {
        match reply {
            ExecutionReply::Success { output } => Ok(output),
            ExecutionReply::Failure { error } => Err(error),
        }
    }
}

/// Distinguishes "could not be placed" from "ran and failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    PlacementFailed,
    ExecutionFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PlacementFailed => "placement_failed",
            ErrorCode::ExecutionFailed => "execution_failed",
        }
    }
}

/// Reply of the submission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitReply {
    Completed {
        task_id: String,
        executed_by: NodeId,
        #[serde(with = "crate::payload")]
        output: Vec<u8>,
        attempts: u32,
    },
    Failed {
        code: ErrorCode,
        error: String,
        /// Exit code of the failed run, when the executor reported one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        executed_by: Option<NodeId>,
    },
}
