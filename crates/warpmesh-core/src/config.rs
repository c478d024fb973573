//! warpmesh.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest request body a node accepts unless configured otherwise.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("peer list contains this node's own address: {0}")]
    SelfInPeers(String),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub node: NodeConfig,
    #[serde(default)]
    pub mesh: PeersConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address peers use to reach this node.
    pub address: String,
    /// Bind address, when different from `address`.
    pub listen: Option<String>,
    /// Request body limit for task submission and execution, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeersConfig {
    #[serde(default)]
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    #[serde(default = "default_collection_timeout")]
    pub collection_timeout: String,
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout: String,
    /// Reference "good" bandwidth in bytes/sec.
    #[serde(default = "default_bandwidth_normalization")]
    pub bandwidth_normalization: f64,
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Bandwidth estimate this node advertises, bytes/sec.
    #[serde(default = "default_network_bandwidth")]
    pub network_bandwidth: f64,
    #[serde(default = "default_latency_baseline")]
    pub latency_baseline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Program and arguments run once per task; input arrives on stdin.
    #[serde(default = "default_executor_command")]
    pub command: Vec<String>,
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_collection_timeout() -> String {
    "500ms".to_string()
}

fn default_execution_timeout() -> String {
    "30s".to_string()
}

fn default_bandwidth_normalization() -> f64 {
    1e9
}

fn default_tie_epsilon() -> f64 {
    1e-9
}

fn default_network_bandwidth() -> f64 {
    1.25e8
}

fn default_latency_baseline() -> String {
    "1ms".to_string()
}

fn default_executor_command() -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), "cat".to_string()]
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            collection_timeout: default_collection_timeout(),
            execution_timeout: default_execution_timeout(),
            bandwidth_normalization: default_bandwidth_normalization(),
            tie_epsilon: default_tie_epsilon(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            network_bandwidth: default_network_bandwidth(),
            latency_baseline: default_latency_baseline(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: default_executor_command(),
        }
    }
}

impl PlacementConfig {
    pub fn collection_timeout(&self) -> Result<Duration, ConfigError> {
        parse_nonzero("placement.collection_timeout", &self.collection_timeout)
    }

    pub fn execution_timeout(&self) -> Result<Duration, ConfigError> {
        parse_nonzero("placement.execution_timeout", &self.execution_timeout)
    }
}

impl ProbeConfig {
    /// Latency baseline in seconds.
    pub fn latency_baseline_secs(&self) -> Result<f64, ConfigError> {
        parse_nonzero("probe.latency_baseline", &self.latency_baseline).map(|d| d.as_secs_f64())
    }
}

impl MeshConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: MeshConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Minimal config for a node with no peers.
    pub fn standalone(address: &str) -> Self {
        MeshConfig {
            node: NodeConfig {
                address: address.to_string(),
                listen: None,
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            mesh: PeersConfig::default(),
            placement: PlacementConfig::default(),
            probe: ProbeConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }

    pub fn listen_addr(&self) -> &str {
        self.node.listen.as_deref().unwrap_or(&self.node.address)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.address.trim().is_empty() {
            return Err(ConfigError::Invalid("node.address must not be empty".to_string()));
        }
        if let Some(own) = self.mesh.peers.iter().find(|p| **p == self.node.address) {
            return Err(ConfigError::SelfInPeers(own.clone()));
        }
        if self.node.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("node.max_body_bytes must be positive".to_string()));
        }
        self.placement.collection_timeout()?;
        self.placement.execution_timeout()?;
        let norm = self.placement.bandwidth_normalization;
        if !norm.is_finite() || norm <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "placement.bandwidth_normalization must be positive, got {norm}"
            )));
        }
        let eps = self.placement.tie_epsilon;
        if !eps.is_finite() || eps < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "placement.tie_epsilon must be non-negative, got {eps}"
            )));
        }
        let bw = self.probe.network_bandwidth;
        if !bw.is_finite() || bw < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "probe.network_bandwidth must be non-negative, got {bw}"
            )));
        }
        self.probe.latency_baseline_secs()?;
        if self.executor.command.is_empty() {
            return Err(ConfigError::Invalid("executor.command must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m". A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

fn parse_nonzero(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match parse_duration(value) {
        Some(d) if !d.is_zero() => Ok(d),
        _ => Err(ConfigError::InvalidDuration {
            field,
            value: value.to_string(),
        }),
    }
}
