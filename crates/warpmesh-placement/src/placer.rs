//! Candidate selection.
//!
//! Given the candidates gathered for one decision, the placer:
//! 1. Drops unreachable candidates (they are never selected)
//! 2. Scores the rest
//! 3. Picks the best, breaking near-ties deterministically

use tracing::debug;

use warpmesh_core::{NodeId, ResourceSnapshot};

use crate::scorer::Scorer;

/// Default tolerance under which two scores count as equal.
pub const DEFAULT_TIE_EPSILON: f64 = 1e-9;

/// A node considered as the executor for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub node: NodeId,
    /// Absent when the node did not answer in time or answered garbage.
    pub snapshot: Option<ResourceSnapshot>,
    pub reachable: bool,
}

impl Candidate {
    pub fn reachable(node: NodeId, snapshot: ResourceSnapshot) -> Self {
        Self {
            node,
            snapshot: Some(snapshot),
            reachable: true,
        }
    }

    pub fn unreachable(node: NodeId) -> Self {
        Self {
            node,
            snapshot: None,
            reachable: false,
        }
    }

    fn viable_snapshot(&self) -> Option<&ResourceSnapshot> {
        if self.reachable {
            self.snapshot.as_ref()
        } else {
            None
        }
    }
}

/// Score computed for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub node: NodeId,
    pub score: f64,
}

/// Outcome of one placement decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementDecision {
    pub chosen: Candidate,
    /// Scores of every candidate that was considered, best first.
    pub scores: Vec<CandidateScore>,
}

impl PlacementDecision {
    pub fn chosen_score(&self) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.node == self.chosen.node)
            .map(|s| s.score)
    }
}

/// Select one candidate, or `None` if nothing is reachable.
///
/// Candidates are visited in `NodeId` order (local first, then peers by
/// address). A later candidate only wins if it beats the current best by
/// more than `epsilon`, so near-ties go to the earlier, preferred node and
/// the result does not depend on input order.
pub fn select(candidates: &[Candidate], scorer: &Scorer, epsilon: f64) -> Option<PlacementDecision> {
    let mut scored: Vec<(&Candidate, f64)> = candidates
        .iter()
        .filter_map(|c| c.viable_snapshot().map(|s| (c, scorer.score(s))))
        .collect();
    scored.sort_by(|a, b| a.0.node.cmp(&b.0.node));

    let mut best: Option<(&Candidate, f64)> = None;
    for &(candidate, score) in &scored {
        match best {
            Some((_, best_score)) if score <= best_score + epsilon => {}
            _ => best = Some((candidate, score)),
        }
    }
    let (chosen, chosen_score) = best?;

    let mut scores: Vec<CandidateScore> = scored
        .iter()
        .map(|(c, score)| CandidateScore {
            node: c.node.clone(),
            score: *score,
        })
        .collect();
    // Descending by score; stable, so equal scores keep preference order.
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));

    debug!(
        chosen = %chosen.node,
        score = chosen_score,
        considered = scores.len(),
        skipped = candidates.len() - scored.len(),
        "placement selected"
    );

    Some(PlacementDecision {
        chosen: chosen.clone(),
        scores,
    })
}

/// Re-run selection without the given node.
pub fn select_excluding(
    candidates: &[Candidate],
    excluded: &NodeId,
    scorer: &Scorer,
    epsilon: f64,
) -> Option<PlacementDecision> {
    let remaining: Vec<Candidate> = candidates
        .iter()
        .filter(|c| &c.node != excluded)
        .cloned()
        .collect();
    select(&remaining, scorer, epsilon)
}
