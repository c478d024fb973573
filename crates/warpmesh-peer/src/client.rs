//! Peer resource client — one bounded request/response per call.
//!
//! The wire is abstracted behind [`PeerTransport`]; the client adds the
//! timeout and validates what comes back.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use warpmesh_core::{ExecutionFailure, ResourceSnapshot, Task, TaskOutput};

/// Peer-level failures. All of them are recoverable during collection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeerError {
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("peer {peer} did not answer within {timeout:?}")]
    Timeout { peer: String, timeout: Duration },

    #[error("peer {peer} sent a malformed response: {reason}")]
    Malformed { peer: String, reason: String },

    #[error("task failed on peer {peer}: {failure}")]
    ExecutionFailed {
        peer: String,
        failure: ExecutionFailure,
    },
}

/// Coarse failure category, used for logging and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerErrorKind {
    Unreachable,
    Timeout,
    Malformed,
    ExecutionFailed,
}

impl PeerErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerErrorKind::Unreachable => "unreachable",
            PeerErrorKind::Timeout => "timeout",
            PeerErrorKind::Malformed => "malformed",
            PeerErrorKind::ExecutionFailed => "execution_failed",
        }
    }
}

impl PeerError {
    pub fn kind(&self) -> PeerErrorKind {
        match self {
            PeerError::Unreachable { .. } => PeerErrorKind::Unreachable,
            PeerError::Timeout { .. } => PeerErrorKind::Timeout,
            PeerError::Malformed { .. } => PeerErrorKind::Malformed,
            PeerError::ExecutionFailed { .. } => PeerErrorKind::ExecutionFailed,
        }
    }

    pub fn peer(&self) -> &str {
        match self {
            PeerError::Unreachable { peer, .. }
            | PeerError::Timeout { peer, .. }
            | PeerError::Malformed { peer, .. }
            | PeerError::ExecutionFailed { peer, .. } => peer,
        }
    }
}

/// Request/response channel to other nodes.
///
/// Implementations report connection problems as `Unreachable` and
/// undecodable bodies as `Malformed`. Timeouts are applied by the client.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Ask the peer to sample its resources.
    async fn fetch_snapshot(&self, peer: &str) -> Result<ResourceSnapshot, PeerError>;

    /// Ask the peer to run a task on itself.
    async fn execute_task(&self, peer: &str, task: &Task) -> Result<TaskOutput, PeerError>;
}

/// Timeout-bounded, validating front for a [`PeerTransport`].
#[derive(Clone)]
pub struct PeerResourceClient {
    transport: Arc<dyn PeerTransport>,
}

impl PeerResourceClient {
    pub fn new(transport: Arc<dyn PeerTransport>) -> Self {
        Self { transport }
    }

    /// Fetch one peer's snapshot within `timeout`.
    pub async fn fetch(&self, peer: &str, timeout: Duration) -> Result<ResourceSnapshot, PeerError> {
        let snapshot = match tokio::time::timeout(timeout, self.transport.fetch_snapshot(peer)).await {
            Ok(result) => result?,
            Err(_) => {
                debug!(%peer, ?timeout, "resource fetch timed out");
                return Err(PeerError::Timeout {
                    peer: peer.to_string(),
                    timeout,
                });
            }
        };

        snapshot.validate().map_err(|e| PeerError::Malformed {
            peer: peer.to_string(),
            reason: e.to_string(),
        })?;
        Ok(snapshot)
    }

    /// Forward a task to a peer and wait up to `timeout` for its result.
    pub async fn execute(&self, peer: &str, task: &Task, timeout: Duration) -> Result<TaskOutput, PeerError> {
        match tokio::time::timeout(timeout, self.transport.execute_task(peer, task)).await {
            Ok(result) => result,
            Err(_) => Err(PeerError::Timeout {
                peer: peer.to_string(),
                timeout,
            }),
        }
    }
}
