//! warpmesh-dispatch — decide where a task runs, then run it there.
//!
//! # Architecture
//!
//! ```text
//! TaskDispatcher::submit(task)
//!   ├── Collecting: ResourceProbe (spawn_blocking) ∥ collect_snapshots(peers, deadline)
//!   ├── Scoring:    placement::select(candidates)
//!   └── Dispatching
//!         ├── Local → TaskExecutor (ProcessExecutor)
//!         └── Peer  → PeerResourceClient::execute
//!               └── on failure: select_excluding(peer) → one more attempt
//! ```

pub mod dispatcher;
pub mod error;
pub mod executor;

pub use dispatcher::{DispatchPhase, DispatchSettings, Submission, TaskDispatcher};
pub use error::{DispatchError, DispatchErrorKind, DispatchResult};
pub use executor::{ProcessExecutor, TaskExecutor};
