//! Task dispatcher — one placement decision per submitted task.
//!
//! A submission moves through these phases:
//!
//! 1. **Collecting** — sample the local node and poll every registered peer
//!    concurrently, all under one deadline
//! 2. **Scoring** — score every candidate that answered and pick the best
//! 3. **Dispatching** — run the task on the chosen node; if a peer fails,
//!    re-place once among the remaining candidates
//! 4. **Completed** / **Failed**
//!
//! Local execution failures are final. They are never retried on a peer.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use warpmesh_core::{ConfigError, ExecutionFailure, MeshConfig, NodeId, Task, TaskOutput};
use warpmesh_metrics::{DispatchMetrics, FetchFailure};
use warpmesh_peer::{PeerError, PeerErrorKind, PeerRegistry, PeerResourceClient, collect_snapshots};
use warpmesh_placement::{Candidate, DEFAULT_TIE_EPSILON, PlacementDecision, Scorer, select, select_excluding};
use warpmesh_probe::ResourceProbe;

use crate::error::{DispatchError, DispatchResult};
use crate::executor::TaskExecutor;

/// Timing and tie-break knobs for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchSettings {
    /// Shared deadline for the whole collection phase.
    pub collection_timeout: Duration,
    /// Upper bound on a forwarded task's round trip.
    pub execution_timeout: Duration,
    pub tie_epsilon: f64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            collection_timeout: Duration::from_millis(500),
            execution_timeout: Duration::from_secs(30),
            tie_epsilon: DEFAULT_TIE_EPSILON,
        }
    }
}

impl DispatchSettings {
    pub fn from_config(config: &MeshConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            collection_timeout: config.placement.collection_timeout()?,
            execution_timeout: config.placement.execution_timeout()?,
            tie_epsilon: config.placement.tie_epsilon,
        })
    }
}

/// Where a submission currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Collecting,
    Scoring,
    Dispatching,
    Completed,
    Failed,
}

/// A task that ran to completion.
#[derive(Debug, Clone)]
pub struct Submission {
    pub output: TaskOutput,
    pub executed_by: NodeId,
    /// The first placement decision. On retry, `executed_by` differs from
    /// `decision.chosen.node`.
    pub decision: PlacementDecision,
    /// 1, or 2 after a retry.
    pub attempts: u32,
}

/// Collects snapshots, scores candidates and runs each task exactly once
/// per attempt on the node that won.
pub struct TaskDispatcher {
    probe: Arc<dyn ResourceProbe>,
    registry: PeerRegistry,
    client: PeerResourceClient,
    executor: Arc<dyn TaskExecutor>,
    scorer: Scorer,
    settings: DispatchSettings,
    metrics: Arc<DispatchMetrics>,
}

impl TaskDispatcher {
    pub fn new(
        probe: Arc<dyn ResourceProbe>,
        registry: PeerRegistry,
        client: PeerResourceClient,
        executor: Arc<dyn TaskExecutor>,
        scorer: Scorer,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            probe,
            registry,
            client,
            executor,
            scorer,
            settings,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Share an existing metrics collector (e.g. with the HTTP layer).
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn executor(&self) -> &Arc<dyn TaskExecutor> {
        &self.executor
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Place and run one task.
    ///
    /// A failed peer run is re-placed once, among the candidates that
    /// answered during collection. If the local probe failed, this node is
    /// not one of them: with no other viable peer the first peer failure
    /// is returned and the task never runs locally.
    pub async fn submit(&self, task: Task) -> DispatchResult<Submission> {
        self.metrics.record_submission();

        enter(&task, DispatchPhase::Collecting);
        let candidates = self.collect().await;

        enter(&task, DispatchPhase::Scoring);
        let Some(decision) = select(&candidates, &self.scorer, self.settings.tie_epsilon) else {
            enter(&task, DispatchPhase::Failed);
            self.metrics.record_placement_failure();
            let reason = if candidates.len() == 1 {
                "local probe failed and no peers are registered".to_string()
            } else {
                format!("local probe failed and none of {} peers answered", candidates.len() - 1)
            };
            warn!(task_id = %task.id, %reason, "no viable candidate");
            return Err(DispatchError::NoViableCandidate {
                task_id: task.id,
                reason,
            });
        };
        info!(
            task_id = %task.id,
            chosen = %decision.chosen.node,
            score = decision.chosen_score(),
            "task placed"
        );

        enter(&task, DispatchPhase::Dispatching);
        let first = decision.chosen.node.clone();
        self.metrics.record_placement(&first);
        let first_failure = match self.run_on(&first, &task).await {
            Ok(output) => return Ok(self.complete(&task, output, first, decision, 1)),
            Err(failure) => failure,
        };

        if first.is_local() {
            return Err(self.fail(&task, first, first_failure));
        }

        let Some(retry) = select_excluding(&candidates, &first, &self.scorer, self.settings.tie_epsilon) else {
            debug!(task_id = %task.id, failed = %first, "no other candidate to retry on");
            return Err(self.fail(&task, first, first_failure));
        };
        let second = retry.chosen.node;
        warn!(
            task_id = %task.id,
            failed = %first,
            error = %first_failure,
            retry_on = %second,
            "peer execution failed, re-placing"
        );
        self.metrics.record_retry();
        self.metrics.record_placement(&second);
        match self.run_on(&second, &task).await {
            Ok(output) => Ok(self.complete(&task, output, second, decision, 2)),
            Err(failure) => Err(self.fail(&task, second, failure)),
        }
    }

    /// Gather one candidate for this node and one per registered peer.
    async fn collect(&self) -> Vec<Candidate> {
        let deadline = Instant::now() + self.settings.collection_timeout;
        let peers = self.registry.peers();

        // The probe blocks on OS queries; keep it off the async workers. It
        // is not bound by the peer deadline.
        let probe = Arc::clone(&self.probe);
        let local = tokio::task::spawn_blocking(move || probe.sample());
        let (local, polls) = tokio::join!(local, collect_snapshots(&self.client, &peers, deadline));

        let mut candidates = Vec::with_capacity(polls.len() + 1);
        candidates.push(match local {
            Ok(Ok(snapshot)) => Candidate::reachable(NodeId::Local, snapshot),
            Ok(Err(e)) => self.local_unavailable(&e.to_string()),
            Err(e) => self.local_unavailable(&format!("probe task panicked: {e}")),
        });

        for poll in polls {
            let node = NodeId::peer(poll.peer);
            match poll.result {
                Ok(snapshot) => candidates.push(Candidate::reachable(node, snapshot)),
                Err(e) => {
                    debug!(peer = %node, reason = e.kind().as_str(), error = %e, "peer dropped from decision");
                    if let Some(kind) = fetch_failure(&e) {
                        self.metrics.record_fetch_failure(kind);
                    }
                    candidates.push(Candidate::unreachable(node));
                }
            }
        }
        candidates
    }

    fn local_unavailable(&self, reason: &str) -> Candidate {
        warn!(error = %reason, "local probe failed, local node excluded from this decision");
        self.metrics.record_local_probe_failure();
        Candidate::unreachable(NodeId::Local)
    }

    async fn run_on(&self, node: &NodeId, task: &Task) -> Result<TaskOutput, ExecutionFailure> {
        match node {
            NodeId::Local => self.executor.execute(task).await,
            NodeId::Peer(address) => self
                .client
                .execute(address, task, self.settings.execution_timeout)
                .await
                .map_err(peer_failure),
        }
    }

    fn complete(
        &self,
        task: &Task,
        output: TaskOutput,
        executed_by: NodeId,
        decision: PlacementDecision,
        attempts: u32,
    ) -> Submission {
        enter(task, DispatchPhase::Completed);
        self.metrics.record_completed();
        info!(task_id = %task.id, executed_by = %executed_by, attempts, "task completed");
        Submission {
            output,
            executed_by,
            decision,
            attempts,
        }
    }

    fn fail(&self, task: &Task, executed_by: NodeId, failure: ExecutionFailure) -> DispatchError {
        enter(task, DispatchPhase::Failed);
        self.metrics.record_execution_failure();
        warn!(task_id = %task.id, executed_by = %executed_by, error = %failure, "task failed");
        DispatchError::ExecutionFailed {
            task_id: task.id.clone(),
            executed_by,
            failure,
        }
    }
}

fn enter(task: &Task, phase: DispatchPhase) {
    debug!(task_id = %task.id, ?phase, "dispatch phase");
}

fn fetch_failure(e: &PeerError) -> Option<FetchFailure> {
    match e.kind() {
        PeerErrorKind::Unreachable => Some(FetchFailure::Unreachable),
        PeerErrorKind::Timeout => Some(FetchFailure::Timeout),
        PeerErrorKind::Malformed => Some(FetchFailure::Malformed),
        PeerErrorKind::ExecutionFailed => None,
    }
}

/// Transport problems on a forwarded task count as that peer failing it.
fn peer_failure(e: PeerError) -> ExecutionFailure {
    match e {
        PeerError::ExecutionFailed { failure, .. } => failure,
        other => ExecutionFailure::new(other.to_string()),
    }
}
