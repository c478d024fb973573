//! Shared types used across warpmesh crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point-in-time measurement of a node's spare capacity.
///
/// Produced fresh for every placement decision and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Fraction (0.0..=1.0) of CPU capacity that is free.
    pub cpu_available: f64,
    /// Fraction (0.0..=1.0) of memory that is free.
    pub memory_available: f64,
    /// Estimated available bandwidth in bytes/sec.
    pub network_bandwidth: f64,
    /// Round-trip estimate to the node in seconds. Zero means unknown.
    pub latency: f64,
}

/// Why a snapshot failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("cpu_available out of range: {0}")]
    CpuOutOfRange(f64),

    #[error("memory_available out of range: {0}")]
    MemoryOutOfRange(f64),

    #[error("network_bandwidth must be finite and non-negative: {0}")]
    InvalidBandwidth(f64),

    #[error("latency must be finite and strictly positive: {0}")]
    InvalidLatency(f64),
}

impl ResourceSnapshot {
    /// Build a snapshot, rejecting out-of-range values.
    pub fn new(
        cpu_available: f64,
        memory_available: f64,
        network_bandwidth: f64,
        latency: f64,
    ) -> Result<Self, SnapshotError> {
        let snapshot = Self {
            cpu_available,
            memory_available,
            network_bandwidth,
            latency,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if !is_fraction(self.cpu_available) {
            return Err(SnapshotError::CpuOutOfRange(self.cpu_available));
        }
        if !is_fraction(self.memory_available) {
            return Err(SnapshotError::MemoryOutOfRange(self.memory_available));
        }
        if !self.network_bandwidth.is_finite() || self.network_bandwidth < 0.0 {
            return Err(SnapshotError::InvalidBandwidth(self.network_bandwidth));
        }
        if !has_known_latency(self.latency) {
            return Err(SnapshotError::InvalidLatency(self.latency));
        }
        Ok(())
    }

    /// Whether the latency figure is usable (finite and > 0).
    pub fn latency_known(&self) -> bool {
        has_known_latency(self.latency)
    }
}

fn is_fraction(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

fn has_known_latency(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Identity of a placement candidate.
///
/// Ordering puts `Local` before every peer and orders peers by address,
/// which is exactly the tie-break preference used during selection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    Local,
    Peer(String),
}

impl NodeId {
    pub fn peer(address: impl Into<String>) -> Self {
        NodeId::Peer(address.into())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, NodeId::Local)
    }

    /// The peer address, if this is a peer.
    pub fn address(&self) -> Option<&str> {
        match self {
            NodeId::Local => None,
            NodeId::Peer(addr) => Some(addr),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Local => f.write_str("local"),
            NodeId::Peer(addr) => f.write_str(addr),
        }
    }
}

/// An opaque unit of work. The scheduler only moves it around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default, with = "crate::payload")]
    pub input: Vec<u8>,
}

impl Task {
    pub fn new(id: impl Into<String>, input: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            input: input.into(),
        }
    }
}

/// Result bytes of a successful task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task_id: String,
    #[serde(default, with = "crate::payload")]
    pub output: Vec<u8>,
}

/// Structured failure reported by whatever ran the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ExecutionFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ExecutionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_snapshot_passes() {
        let s = ResourceSnapshot::new(0.5, 0.25, 1e9, 0.01).unwrap();
        assert!(s.latency_known());
    }

    #[test]
    fn zero_latency_is_rejected() {
        let err = ResourceSnapshot::new(0.5, 0.5, 1e9, 0.0).unwrap_err();
        assert_eq!(err, SnapshotError::InvalidLatency(0.0));
    }

    #[test]
    fn out_of_range_fractions_are_rejected() {
        assert!(matches!(
            ResourceSnapshot::new(1.5, 0.5, 0.0, 0.1),
            Err(SnapshotError::CpuOutOfRange(_))
        ));
        assert!(matches!(
            ResourceSnapshot::new(0.5, -0.1, 0.0, 0.1),
            Err(SnapshotError::MemoryOutOfRange(_))
        ));
        assert!(matches!(
            ResourceSnapshot::new(f64::NAN, 0.5, 0.0, 0.1),
            Err(SnapshotError::CpuOutOfRange(_))
        ));
    }

    #[test]
    fn negative_bandwidth_is_rejected() {
        assert!(matches!(
            ResourceSnapshot::new(0.5, 0.5, -1.0, 0.1),
            Err(SnapshotError::InvalidBandwidth(_))
        ));
    }

    #[test]
    fn node_id_orders_local_first_then_by_address() {
        let mut ids = vec![
            NodeId::peer("10.0.0.9:7700"),
            NodeId::Local,
            NodeId::peer("10.0.0.1:7700"),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                NodeId::Local,
                NodeId::peer("10.0.0.1:7700"),
                NodeId::peer("10.0.0.9:7700"),
            ]
        );
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::Local.to_string(), "local");
        assert_eq!(NodeId::peer("a:1").to_string(), "a:1");
    }

    #[test]
    fn snapshot_missing_field_fails_to_decode() {
        let json = r#"{"cpu_available":0.5,"memory_available":0.5,"network_bandwidth":1.0}"#;
        assert!(serde_json::from_str::<ResourceSnapshot>(json).is_err());
    }
}
