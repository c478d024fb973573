//! Node mode — wire the configured components together and serve them.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use warpmesh_api::{ApiState, build_router};
use warpmesh_core::MeshConfig;
use warpmesh_dispatch::{DispatchSettings, ProcessExecutor, TaskDispatcher};
use warpmesh_peer::{HttpTransport, PeerRegistry, PeerResourceClient};
use warpmesh_placement::Scorer;
use warpmesh_probe::{ResourceProbe, SystemProbe};

/// Build the API state for a node from its config.
pub fn build_state(config: &MeshConfig) -> anyhow::Result<ApiState> {
    let probe: Arc<dyn ResourceProbe> =
        Arc::new(SystemProbe::from_config(config).context("configuring resource probe")?);
    let registry = PeerRegistry::new(config.node.address.clone(), config.mesh.peers.clone())
        .context("building peer registry")?;
    let client = PeerResourceClient::new(Arc::new(HttpTransport::new()));
    let executor = ProcessExecutor::from_config(config).context("executor.command must not be empty")?;
    let settings = DispatchSettings::from_config(config)?;
    let scorer = Scorer::new(config.placement.bandwidth_normalization);

    let dispatcher = TaskDispatcher::new(
        probe.clone(),
        registry,
        client,
        Arc::new(executor),
        scorer,
        settings,
    );
    Ok(ApiState::new(probe, Arc::new(dispatcher)).with_max_body_bytes(config.node.max_body_bytes))
}

/// Serve a node until Ctrl-C.
pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = MeshConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let state = build_state(&config)?;

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("binding {}", config.listen_addr()))?;
    info!(
        address = %config.node.address,
        listen = %listener.local_addr()?,
        peers = config.mesh.peers.len(),
        "warpmesh node starting"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("warpmesh node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Sample once and print the snapshot.
pub fn probe(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => MeshConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => MeshConfig::standalone("127.0.0.1:7700"),
    };
    let snapshot = SystemProbe::from_config(&config)?.sample()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
