//! warpmesh-peer — everything that talks to other nodes.
//!
//! # Architecture
//!
//! ```text
//! PeerRegistry ──► peers() snapshot
//!                      │
//! collect_snapshots()  ▼   (one deadline for the whole decision)
//!   ├── PeerResourceClient::fetch(peer, budget) ×N, concurrently
//!   │     └── PeerTransport (HttpTransport: GET /v1/resources)
//!   └── abort stragglers at the deadline → PeerError::Timeout
//!
//! PeerResourceClient::execute(peer, task, timeout)
//!   └── PeerTransport (HttpTransport: POST /v1/tasks/execute)
//! ```

pub mod client;
pub mod fanout;
pub mod registry;
pub mod transport;

pub use client::{PeerError, PeerErrorKind, PeerResourceClient, PeerTransport};
pub use fanout::{PeerPoll, collect_snapshots};
pub use registry::{PeerRegistry, RegistryError};
pub use transport::HttpTransport;
