//! HTTP handlers.
//!
//! The peer-facing routes (`resources`, `execute`) only ever touch this node.
//! `submit` is the one route that goes through placement.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{debug, warn};

use warpmesh_core::{ErrorCode, ExecutionReply, SubmitReply, Task};
use warpmesh_dispatch::DispatchError;

use crate::ApiState;

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /v1/resources
///
/// Samples on every request; a failed probe is a 503 so callers treat this
/// node as unreachable rather than idle.
pub async fn resources(State(state): State<ApiState>) -> impl IntoResponse {
    let probe = state.probe.clone();
    match tokio::task::spawn_blocking(move || probe.sample()).await {
        Ok(Ok(snapshot)) => Json(snapshot).into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "resource probe failed");
            error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// POST /v1/tasks/execute
///
/// Runs on this node without placement, so a forwarded task is never
/// forwarded again. Task failures are reported in the body with 200.
pub async fn execute(State(state): State<ApiState>, Json(task): Json<Task>) -> impl IntoResponse {
    debug!(task_id = %task.id, "executing forwarded task");
    let result = state.dispatcher.executor().execute(&task).await;
    Json(ExecutionReply::from(result))
}

/// POST /v1/tasks
pub async fn submit(State(state): State<ApiState>, Json(task): Json<Task>) -> impl IntoResponse {
    match state.dispatcher.submit(task).await {
        Ok(sub) => (
            StatusCode::OK,
            Json(SubmitReply::Completed {
                task_id: sub.output.task_id,
                executed_by: sub.executed_by,
                output: sub.output.output,
                attempts: sub.attempts,
            }),
        ),
        Err(e) => {
            let status = match e.code() {
                ErrorCode::PlacementFailed => StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ExecutionFailed => StatusCode::BAD_GATEWAY,
            };
            let executed_by = e.executed_by().cloned();
            let (error, exit_code) = match &e {
                DispatchError::ExecutionFailed { failure, .. } => {
                    (failure.message.clone(), failure.exit_code)
                }
                DispatchError::NoViableCandidate { .. } => (e.to_string(), None),
            };
            (
                status,
                Json(SubmitReply::Failed {
                    code: e.code(),
                    error,
                    exit_code,
                    executed_by,
                }),
            )
        }
    }
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = warpmesh_metrics::render_prometheus(&state.dispatcher.metrics().snapshot());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use warpmesh_core::{ExecutionFailure, NodeId, ResourceSnapshot, TaskOutput};
    use warpmesh_dispatch::{DispatchSettings, TaskDispatcher, TaskExecutor};
    use warpmesh_peer::{HttpTransport, PeerRegistry, PeerResourceClient};
    use warpmesh_placement::Scorer;
    use warpmesh_probe::{ProbeError, ResourceProbe};

    use super::*;

    struct FixedProbe(Option<ResourceSnapshot>);

    impl ResourceProbe for FixedProbe {
        fn sample(&self) -> Result<ResourceSnapshot, ProbeError> {
            self.0.ok_or(ProbeError::ZeroCapacity("memory"))
        }
    }

    struct Upper;

    #[async_trait]
    impl TaskExecutor for Upper {
        async fn execute(&self, task: &Task) -> Result<TaskOutput, ExecutionFailure> {
            if task.input.is_empty() {
                return Err(ExecutionFailure::new("empty input").with_exit_code(2));
            }
            Ok(TaskOutput {
                task_id: task.id.clone(),
                output: task.input.to_ascii_uppercase(),
            })
        }
    }

    fn test_state(snapshot: Option<ResourceSnapshot>) -> ApiState {
        let probe: Arc<dyn ResourceProbe> = Arc::new(FixedProbe(snapshot));
        let dispatcher = TaskDispatcher::new(
            probe.clone(),
            PeerRegistry::empty("127.0.0.1:7700"),
            PeerResourceClient::new(Arc::new(HttpTransport::new())),
            Arc::new(Upper),
            Scorer::new(1e9),
            DispatchSettings::default(),
        );
        ApiState::new(probe, Arc::new(dispatcher))
    }

    fn healthy() -> Option<ResourceSnapshot> {
        Some(ResourceSnapshot::new(0.5, 0.5, 1e8, 0.001).unwrap())
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = healthz().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn resources_returns_snapshot() {
        let resp = resources(State(test_state(healthy()))).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["cpu_available"], 0.5);
    }

    #[tokio::test]
    async fn resources_probe_failure_is_unavailable() {
        let resp = resources(State(test_state(None))).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn execute_runs_locally() {
        let task = Task::new("t1", b"abc".to_vec());
        let resp = execute(State(test_state(healthy())), Json(task)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["output"]["task_id"], "t1");
    }

    #[tokio::test]
    async fn execute_failure_is_reported_in_body() {
        let task = Task::new("t1", Vec::new());
        let resp = execute(State(test_state(healthy())), Json(task)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"]["exit_code"], 2);
    }

    #[tokio::test]
    async fn submit_without_peers_runs_locally() {
        let state = test_state(healthy());
        let resp = submit(State(state.clone()), Json(Task::new("t1", b"abc".to_vec())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let reply: SubmitReply = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(
            reply,
            SubmitReply::Completed {
                task_id: "t1".to_string(),
                executed_by: NodeId::Local,
                output: b"ABC".to_vec(),
                attempts: 1,
            }
        );
        assert_eq!(state.dispatcher.metrics().snapshot().completed, 1);
    }

    #[tokio::test]
    async fn submit_with_no_candidate_is_unavailable() {
        let resp = submit(State(test_state(None)), Json(Task::new("t1", b"abc".to_vec())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(resp).await;
        assert_eq!(json["code"], "placement_failed");
    }

    #[tokio::test]
    async fn submit_execution_failure_is_bad_gateway() {
        let resp = submit(State(test_state(healthy())), Json(Task::new("t1", Vec::new())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(resp).await;
        assert_eq!(json["code"], "execution_failed");
        assert_eq!(json["error"], "empty input");
        assert_eq!(json["exit_code"], 2);
        assert_eq!(json["executed_by"], "local");
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let resp = prometheus_metrics(State(test_state(healthy()))).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
