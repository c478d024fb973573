//! warpmesh-probe — local resource measurement.
//!
//! Every call to [`ResourceProbe::sample`] performs a fresh OS query and
//! returns an independent [`ResourceSnapshot`]. Nothing is cached; callers
//! that need throttling must add it themselves.
//!
//! A failed query is an error, never a zeroed snapshot: the dispatcher
//! turns it into an unreachable local candidate for that decision.

use thiserror::Error;
use tracing::debug;

use warpmesh_core::{MeshConfig, ResourceSnapshot, SnapshotError};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("system resource query failed: {0}")]
    System(#[from] sys_info::Error),

    #[error("system reported zero {0}")]
    ZeroCapacity(&'static str),

    #[error("measured snapshot is invalid: {0}")]
    Invalid(#[from] SnapshotError),

    #[error("invalid probe configuration: {0}")]
    Config(String),
}

/// Source of the local node's resource snapshot.
pub trait ResourceProbe: Send + Sync {
    fn sample(&self) -> Result<ResourceSnapshot, ProbeError>;
}

/// Probe backed by the operating system's load average and memory counters.
///
/// Bandwidth and latency cannot be measured locally without traffic, so they
/// are the node's configured estimates.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    network_bandwidth: f64,
    latency_baseline: f64,
}

impl SystemProbe {
    pub fn new(network_bandwidth: f64, latency_baseline: f64) -> Result<Self, ProbeError> {
        if !network_bandwidth.is_finite() || network_bandwidth < 0.0 {
            return Err(ProbeError::Config(format!(
                "network bandwidth must be non-negative, got {network_bandwidth}"
            )));
        }
        if !latency_baseline.is_finite() || latency_baseline <= 0.0 {
            return Err(ProbeError::Config(format!(
                "latency baseline must be positive, got {latency_baseline}"
            )));
        }
        Ok(Self {
            network_bandwidth,
            latency_baseline,
        })
    }

    pub fn from_config(config: &MeshConfig) -> Result<Self, ProbeError> {
        let latency = config
            .probe
            .latency_baseline_secs()
            .map_err(|e| ProbeError::Config(e.to_string()))?;
        Self::new(config.probe.network_bandwidth, latency)
    }
}

impl ResourceProbe for SystemProbe {
    fn sample(&self) -> Result<ResourceSnapshot, ProbeError> {
        let load = sys_info::loadavg()?;
        let cpus = sys_info::cpu_num()?;
        let mem = sys_info::mem_info()?;

        let cpu_available = cpu_headroom(load.one, cpus).ok_or(ProbeError::ZeroCapacity("cpus"))?;
        let memory_available =
            memory_headroom(mem.total, mem.avail, mem.free).ok_or(ProbeError::ZeroCapacity("memory"))?;

        let snapshot = ResourceSnapshot::new(
            cpu_available,
            memory_available,
            self.network_bandwidth,
            self.latency_baseline,
        )?;

        debug!(
            cpu = snapshot.cpu_available,
            memory = snapshot.memory_available,
            load_1m = load.one,
            cpus,
            "sampled local resources"
        );
        Ok(snapshot)
    }
}

/// Free CPU fraction from the 1-minute load average.
fn cpu_headroom(load_one: f64, cpus: u32) -> Option<f64> {
    if cpus == 0 || !load_one.is_finite() {
        return None;
    }
    Some((1.0 - load_one / f64::from(cpus)).clamp(0.0, 1.0))
}

/// Free memory fraction. Some platforms report no "available" figure;
/// fall back to plain free memory there.
fn memory_headroom(total_kb: u64, avail_kb: u64, free_kb: u64) -> Option<f64> {
    if total_kb == 0 {
        return None;
    }
    let usable = if avail_kb > 0 { avail_kb } else { free_kb };
    Some((usable as f64 / total_kb as f64).clamp(0.0, 1.0))
}
