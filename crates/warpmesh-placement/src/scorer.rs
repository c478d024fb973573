//! Snapshot scoring for placement decisions.
//!
//! A snapshot is reduced to one number using a weighted sum of:
//! - **CPU headroom** (dominant)
//! - **Memory headroom**
//! - **Bandwidth**, normalized against a reference and capped at 1.0
//! - **Inverse latency**, a tie-breaking term

use warpmesh_core::ResourceSnapshot;

/// Weights for the scoring components. They sum to 1.0 by default.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoringWeights {
    pub cpu: f64,
    pub memory: f64,
    pub bandwidth: f64,
    pub latency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cpu: 0.4,
            memory: 0.3,
            bandwidth: 0.2,
            latency: 0.1,
        }
    }
}

/// Individual (unweighted) score components for debugging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub cpu: f64,
    pub memory: f64,
    /// Normalized bandwidth in 0.0..=1.0.
    pub bandwidth: f64,
    /// `1 / latency`, or 0.0 when latency is unknown.
    pub latency: f64,
}

/// Converts snapshots into comparable scores. Pure; holds only configuration.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    weights: ScoringWeights,
    bandwidth_normalization: f64,
}

impl Scorer {
    /// Create a scorer with the default weights.
    ///
    /// A non-positive or non-finite normalization constant falls back to 1.0
    /// so the bandwidth term stays bounded.
    pub fn new(bandwidth_normalization: f64) -> Self {
        Self::with_weights(ScoringWeights::default(), bandwidth_normalization)
    }

    pub fn with_weights(weights: ScoringWeights, bandwidth_normalization: f64) -> Self {
        let bandwidth_normalization = if bandwidth_normalization.is_finite() && bandwidth_normalization > 0.0 {
            bandwidth_normalization
        } else {
            1.0
        };
        Self {
            weights,
            bandwidth_normalization,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn bandwidth_normalization(&self) -> f64 {
        self.bandwidth_normalization
    }

    pub fn breakdown(&self, snapshot: &ResourceSnapshot) -> ScoreBreakdown {
        let bandwidth = if snapshot.network_bandwidth.is_finite() && snapshot.network_bandwidth > 0.0 {
            (snapshot.network_bandwidth / self.bandwidth_normalization).min(1.0)
        } else {
            0.0
        };
        // Zero latency means "unknown", not "instant".
        let latency = if snapshot.latency_known() {
            1.0 / snapshot.latency
        } else {
            0.0
        };
        ScoreBreakdown {
            cpu: snapshot.cpu_available,
            memory: snapshot.memory_available,
            bandwidth,
            latency,
        }
    }

    /// Score a snapshot (higher = better).
    pub fn score(&self, snapshot: &ResourceSnapshot) -> f64 {
        let b = self.breakdown(snapshot);
        self.weights.cpu * b.cpu
            + self.weights.memory * b.memory
            + self.weights.bandwidth * b.bandwidth
            + self.weights.latency * b.latency
    }
}
