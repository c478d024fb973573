//! warpmesh-core — types shared by every warpmesh crate.
//!
//! - **`types`** — resource snapshots, candidate identity, tasks and results
//! - **`wire`** — JSON bodies for the node-to-node and submission endpoints
//! - **`payload`** — base64 encoding of task bytes inside those bodies
//! - **`config`** — `warpmesh.toml` parsing and validation

pub mod config;
pub mod payload;
pub mod types;
pub mod wire;

pub use config::{ConfigError, DEFAULT_MAX_BODY_BYTES, MeshConfig, parse_duration};
pub use types::*;
pub use wire::{ErrorCode, ExecutionReply, SubmitReply};
