//! Dispatcher error types.

use thiserror::Error;

use warpmesh_core::{ErrorCode, ExecutionFailure, NodeId};

/// Errors surfaced to whoever submitted a task.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Nothing could be scored: the local node could not be measured and no
    /// peer answered.
    #[error("no viable candidate for task {task_id}: {reason}")]
    NoViableCandidate { task_id: String, reason: String },

    #[error("task {task_id} failed on {executed_by}: {failure}")]
    ExecutionFailed {
        task_id: String,
        executed_by: NodeId,
        failure: ExecutionFailure,
    },
}

/// What the caller should do about it: placement problems are worth
/// retrying later, execution problems point at the task itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    Placement,
    Execution,
}

impl DispatchError {
    pub fn kind(&self) -> DispatchErrorKind {
        match self {
            DispatchError::NoViableCandidate { .. } => DispatchErrorKind::Placement,
            DispatchError::ExecutionFailed { .. } => DispatchErrorKind::Execution,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self.kind() {
            DispatchErrorKind::Placement => ErrorCode::PlacementFailed,
            DispatchErrorKind::Execution => ErrorCode::ExecutionFailed,
        }
    }

    /// The node that ran the task, for execution failures.
    pub fn executed_by(&self) -> Option<&NodeId> {
        match self {
            DispatchError::NoViableCandidate { .. } => None,
            DispatchError::ExecutionFailed { executed_by, .. } => Some(executed_by),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
