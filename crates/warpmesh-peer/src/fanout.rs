//! Concurrent resource collection across all peers for one decision.
//!
//! Every peer gets one fetch; all fetches share a single deadline. Whatever
//! has answered by then is used, everything still pending is aborted and
//! recorded as a timeout. Results that would arrive later are dropped with
//! their task and can never reach the scorer.

use std::collections::HashMap;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use warpmesh_core::ResourceSnapshot;

use crate::client::{PeerError, PeerResourceClient};

/// Outcome of polling one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerPoll {
    pub peer: String,
    pub result: Result<ResourceSnapshot, PeerError>,
}

/// Poll `peers` concurrently until all answer or `deadline` passes.
///
/// Returns one entry per peer, in the order given.
pub async fn collect_snapshots(
    client: &PeerResourceClient,
    peers: &[String],
    deadline: Instant,
) -> Vec<PeerPoll> {
    if peers.is_empty() {
        return Vec::new();
    }

    let budget = deadline.saturating_duration_since(Instant::now());
    let mut set = JoinSet::new();
    for peer in peers {
        let client = client.clone();
        let peer = peer.clone();
        set.spawn(async move {
            let result = client.fetch(&peer, budget).await;
            (peer, result)
        });
    }

    let mut answered: HashMap<String, Result<ResourceSnapshot, PeerError>> = HashMap::new();
    let mut deadline_hit = false;
    loop {
        match tokio::time::timeout_at(deadline, set.join_next()).await {
            Ok(Some(Ok((peer, result)))) => {
                answered.insert(peer, result);
            }
            Ok(Some(Err(e))) => {
                warn!(error = %e, "peer fetch task ended abnormally");
            }
            Ok(None) => break,
            Err(_) => {
                deadline_hit = true;
                break;
            }
        }
    }
    let pending = set.len();
    set.abort_all();

    if deadline_hit {
        debug!(pending, answered = answered.len(), "collection deadline reached");
    }

    peers
        .iter()
        .map(|peer| {
            let result = answered.remove(peer).unwrap_or_else(|| {
                Err(if deadline_hit {
                    PeerError::Timeout {
                        peer: peer.clone(),
                        timeout: budget,
                    }
                } else {
                    PeerError::Unreachable {
                        peer: peer.clone(),
                        reason: "fetch task aborted".to_string(),
                    }
                })
            });
            PeerPoll {
                peer: peer.clone(),
                result,
            }
        })
        .collect()
}
