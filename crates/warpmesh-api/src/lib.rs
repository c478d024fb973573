//! warpmesh-api — HTTP surface of a mesh node.
//!
//! Other nodes use the resource and execute routes; clients submit tasks
//! for placement.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness |
//! | GET | `/v1/resources` | Fresh local resource snapshot |
//! | POST | `/v1/tasks/execute` | Run a task on this node only |
//! | POST | `/v1/tasks` | Place a task on the best node and run it |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use warpmesh_core::DEFAULT_MAX_BODY_BYTES;
use warpmesh_dispatch::TaskDispatcher;
use warpmesh_peer::transport::{EXECUTE_PATH, RESOURCES_PATH, SUBMIT_PATH};
use warpmesh_probe::ResourceProbe;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub probe: Arc<dyn ResourceProbe>,
    pub dispatcher: Arc<TaskDispatcher>,
    /// Largest request body accepted on any route.
    pub max_body_bytes: usize,
}

impl ApiState {
    pub fn new(probe: Arc<dyn ResourceProbe>, dispatcher: Arc<TaskDispatcher>) -> Self {
        Self {
            probe,
            dispatcher,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

/// Build the node router.
pub fn build_router(state: ApiState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(RESOURCES_PATH, get(handlers::resources))
        .route(EXECUTE_PATH, post(handlers::execute))
        .route(SUBMIT_PATH, post(handlers::submit))
        .route("/metrics", get(handlers::prometheus_metrics))
        .layer(body_limit)
        .with_state(state)
}
