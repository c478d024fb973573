//! warpmesh placement — pick the node that runs a task.
//!
//! This crate is pure: it never talks to the network. The dispatcher feeds
//! it the candidates gathered for one decision and gets back a
//! [`PlacementDecision`].
//!
//! # Components
//!
//! - **`scorer`** — snapshot → score (CPU/memory dominant, capped bandwidth,
//!   inverse latency as tie-breaker)
//! - **`placer`** — candidate filtering, selection and deterministic tie-break

pub mod placer;
pub mod scorer;

pub use placer::{
    Candidate, CandidateScore, DEFAULT_TIE_EPSILON, PlacementDecision, select, select_excluding,
};
pub use scorer::{ScoreBreakdown, Scorer, ScoringWeights};
