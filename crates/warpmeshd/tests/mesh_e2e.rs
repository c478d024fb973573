//! Two-node mesh tests over real sockets.
//!
//! Each node is a full router bound to an ephemeral 127.0.0.1 port and
//! talks to the other through `HttpTransport`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use warpmesh_api::{ApiState, build_router};
use warpmesh_core::{DEFAULT_MAX_BODY_BYTES, ExecutionFailure, NodeId, ResourceSnapshot, SubmitReply, Task, TaskOutput};
use warpmesh_dispatch::{DispatchSettings, TaskDispatcher, TaskExecutor};
use warpmesh_peer::{HttpTransport, PeerErrorKind, PeerRegistry, PeerResourceClient};
use warpmesh_placement::{DEFAULT_TIE_EPSILON, Scorer};
use warpmesh_probe::{ProbeError, ResourceProbe};

struct FixedProbe(ResourceSnapshot);

impl ResourceProbe for FixedProbe {
    fn sample(&self) -> Result<ResourceSnapshot, ProbeError> {
        Ok(self.0)
    }
}

/// Prefixes output with the node's name so tests can see who ran a task.
struct Tagged {
    name: &'static str,
    fail: bool,
}

#[async_trait]
impl TaskExecutor for Tagged {
    async fn execute(&self, task: &Task) -> Result<TaskOutput, ExecutionFailure> {
        if self.fail {
            return Err(ExecutionFailure::new(format!("{} refused", self.name)).with_exit_code(1));
        }
        let mut output = format!("{}:", self.name).into_bytes();
        output.extend_from_slice(&task.input);
        Ok(TaskOutput {
            task_id: task.id.clone(),
            output,
        })
    }
}

fn snapshot(cpu: f64, mem: f64) -> ResourceSnapshot {
    ResourceSnapshot::new(cpu, mem, 1e8, 0.001).unwrap()
}

/// Start a node and return its address.
async fn spawn_node(snapshot: ResourceSnapshot, peers: Vec<String>, executor: Tagged) -> String {
    spawn_limited_node(snapshot, peers, executor, DEFAULT_MAX_BODY_BYTES).await
}

async fn spawn_limited_node(
    snapshot: ResourceSnapshot,
    peers: Vec<String>,
    executor: Tagged,
    max_body_bytes: usize,
) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let probe: Arc<dyn ResourceProbe> = Arc::new(FixedProbe(snapshot));
    let settings = DispatchSettings {
        collection_timeout: Duration::from_millis(500),
        execution_timeout: Duration::from_secs(5),
        tie_epsilon: DEFAULT_TIE_EPSILON,
    };
    let dispatcher = TaskDispatcher::new(
        probe.clone(),
        PeerRegistry::new(address.clone(), peers).unwrap(),
        PeerResourceClient::new(Arc::new(HttpTransport::new())),
        Arc::new(executor),
        Scorer::new(1e9),
        settings,
    );
    let router = build_router(ApiState::new(probe, Arc::new(dispatcher)).with_max_body_bytes(max_body_bytes));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    address
}

#[tokio::test]
async fn stronger_peer_runs_the_task() {
    let b = spawn_node(snapshot(0.9, 0.9), vec![], Tagged { name: "b", fail: false }).await;
    let a = spawn_node(snapshot(0.1, 0.2), vec![b.clone()], Tagged { name: "a", fail: false }).await;

    let reply = HttpTransport::new()
        .submit_task(&a, &Task::new("job-1", b"payload".to_vec()))
        .await
        .unwrap();
    assert_eq!(
        reply,
        SubmitReply::Completed {
            task_id: "job-1".to_string(),
            executed_by: NodeId::peer(b),
            output: b"b:payload".to_vec(),
            attempts: 1,
        }
    );
}

#[tokio::test]
async fn weaker_peer_leaves_the_task_local() {
    let b = spawn_node(snapshot(0.1, 0.1), vec![], Tagged { name: "b", fail: false }).await;
    let a = spawn_node(snapshot(0.8, 0.8), vec![b], Tagged { name: "a", fail: false }).await;

    let reply = HttpTransport::new()
        .submit_task(&a, &Task::new("job-2", b"x".to_vec()))
        .await
        .unwrap();
    match reply {
        SubmitReply::Completed {
            executed_by, output, ..
        } => {
            assert_eq!(executed_by, NodeId::Local);
            assert_eq!(output, b"a:x");
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_peer_falls_back_to_local() {
    let a = spawn_node(
        snapshot(0.3, 0.3),
        vec!["127.0.0.1:1".to_string()],
        Tagged { name: "a", fail: false },
    )
    .await;

    let reply = HttpTransport::new()
        .submit_task(&a, &Task::new("job-3", b"y".to_vec()))
        .await
        .unwrap();
    assert!(matches!(
        reply,
        SubmitReply::Completed {
            executed_by: NodeId::Local,
            attempts: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn failing_peer_is_retried_locally() {
    let b = spawn_node(snapshot(0.9, 0.9), vec![], Tagged { name: "b", fail: true }).await;
    let a = spawn_node(snapshot(0.2, 0.2), vec![b], Tagged { name: "a", fail: false }).await;

    let reply = HttpTransport::new()
        .submit_task(&a, &Task::new("job-4", b"z".to_vec()))
        .await
        .unwrap();
    assert_eq!(
        reply,
        SubmitReply::Completed {
            task_id: "job-4".to_string(),
            executed_by: NodeId::Local,
            output: b"a:z".to_vec(),
            attempts: 2,
        }
    );
}

#[tokio::test]
async fn local_failure_is_reported_with_its_node() {
    let a = spawn_node(snapshot(0.5, 0.5), vec![], Tagged { name: "a", fail: true }).await;

    let reply = HttpTransport::new()
        .submit_task(&a, &Task::new("job-5", Vec::new()))
        .await
        .unwrap();
    match reply {
        SubmitReply::Failed {
            code,
            error,
            exit_code,
            executed_by,
        } => {
            assert_eq!(code.as_str(), "execution_failed");
            assert_eq!(error, "a refused");
            assert_eq!(exit_code, Some(1));
            assert_eq!(executed_by, Some(NodeId::Local));
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn megabyte_payload_is_forwarded_to_peer() {
    let b = spawn_node(snapshot(0.9, 0.9), vec![], Tagged { name: "b", fail: false }).await;
    let a = spawn_node(snapshot(0.1, 0.2), vec![b.clone()], Tagged { name: "a", fail: false }).await;

    let input: Vec<u8> = (0..(1usize << 20) + 7).map(|i| (i % 251) as u8).collect();
    let reply = HttpTransport::new()
        .submit_task(&a, &Task::new("job-big", input.clone()))
        .await
        .unwrap();
    match reply {
        SubmitReply::Completed {
            executed_by,
            output,
            attempts,
            ..
        } => {
            assert_eq!(executed_by, NodeId::peer(b));
            assert_eq!(attempts, 1);
            assert_eq!(&output[..2], b"b:");
            assert_eq!(&output[2..], &input[..]);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn body_over_the_limit_is_reported_as_status() {
    let a = spawn_limited_node(snapshot(0.5, 0.5), vec![], Tagged { name: "a", fail: false }, 1024).await;

    let err = HttpTransport::new()
        .submit_task(&a, &Task::new("job-6", vec![b'q'; 2048]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), PeerErrorKind::Malformed);
    assert!(err.to_string().contains("413"), "{err}");
}
