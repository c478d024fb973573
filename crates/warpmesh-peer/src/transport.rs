//! HTTP/1.1 + JSON transport between warpmesh nodes.
//!
//! One short-lived connection per request: plain TCP, a hyper handshake,
//! a single exchange.

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use tracing::debug;

use warpmesh_core::{ExecutionFailure, ExecutionReply, ResourceSnapshot, SubmitReply, Task, TaskOutput};

use crate::client::{PeerError, PeerTransport};

pub const RESOURCES_PATH: &str = "/v1/resources";
pub const EXECUTE_PATH: &str = "/v1/tasks/execute";
pub const SUBMIT_PATH: &str = "/v1/tasks";

const USER_AGENT: &str = concat!("warpmesh/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }

    /// Submit a task to a node for placement (caller-facing endpoint).
    ///
    /// Placement and execution failures (503, 502) carry a structured
    /// body and are decoded like a success. Any other status is reported
    /// as-is without touching the body.
    pub async fn submit_task(&self, node: &str, task: &Task) -> Result<SubmitReply, PeerError> {
        let body = encode(node, task)?;
        let (status, bytes) = self.round_trip(node, Method::POST, SUBMIT_PATH, body).await?;
        if !carries_submit_reply(status) {
            return Err(PeerError::Malformed {
                peer: node.to_string(),
                reason: format!("status {status}"),
            });
        }
        decode(node, &bytes)
    }

    async fn round_trip(
        &self,
        peer: &str,
        method: Method,
        path: &str,
        body: Bytes,
    ) -> Result<(StatusCode, Bytes), PeerError> {
        let unreachable = |reason: String| PeerError::Unreachable {
            peer: peer.to_string(),
            reason,
        };

        let stream = tokio::net::TcpStream::connect(peer)
            .await
            .map_err(|e| unreachable(format!("connect: {e}")))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| unreachable(format!("handshake: {e}")))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method(method)
            .uri(path)
            .header("host", peer)
            .header("user-agent", USER_AGENT)
            .header("content-type", "application/json")
            .body(Full::new(body))
            .map_err(|e| unreachable(format!("request: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| unreachable(format!("request: {e}")))?;

        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| unreachable(format!("body: {e}")))?
            .to_bytes();

        Ok((status, bytes))
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn fetch_snapshot(&self, peer: &str) -> Result<ResourceSnapshot, PeerError> {
        let started = Instant::now();
        let (status, bytes) = self
            .round_trip(peer, Method::GET, RESOURCES_PATH, Bytes::new())
            .await?;
        debug!(%peer, %status, rtt = ?started.elapsed(), "resource query answered");

        if !status.is_success() {
            return Err(PeerError::Malformed {
                peer: peer.to_string(),
                reason: format!("status {status}"),
            });
        }
        decode(peer, &bytes)
    }

    async fn execute_task(&self, peer: &str, task: &Task) -> Result<TaskOutput, PeerError> {
        let body = encode(peer, task)?;
        let (status, bytes) = self.round_trip(peer, Method::POST, EXECUTE_PATH, body).await?;
        if !status.is_success() {
            return Err(PeerError::Malformed {
                peer: peer.to_string(),
                reason: format!("status {status}"),
            });
        }

        let reply: ExecutionReply = decode(peer, &bytes)?;
        Result::<TaskOutput, ExecutionFailure>::from(reply).map_err(|failure| PeerError::ExecutionFailed {
            peer: peer.to_string(),
            failure,
        })
    }
}

fn carries_submit_reply(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::BAD_GATEWAY
}

fn encode(peer: &str, task: &Task) -> Result<Bytes, PeerError> {
    serde_json::to_vec(task)
        .map(Bytes::from)
        .map_err(|e| PeerError::Malformed {
            peer: peer.to_string(),
            reason: format!("encode task: {e}"),
        })
}

fn decode<T: serde::de::DeserializeOwned>(peer: &str, bytes: &[u8]) -> Result<T, PeerError> {
    serde_json::from_slice(bytes).map_err(|e| PeerError::Malformed {
        peer: peer.to_string(),
        reason: e.to_string(),
    })
}
