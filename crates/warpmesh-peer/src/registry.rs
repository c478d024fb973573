//! The configured set of peers a node may offload to.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("peer list contains this node's own address: {0}")]
    SelfAddress(String),

    #[error("peer address must not be empty")]
    EmptyAddress,
}

/// Ordered, de-duplicated peer addresses, never including this node.
///
/// Readers get an immutable `Arc<[String]>` snapshot, so concurrent
/// placement decisions never lock each other and never see a partially
/// applied reconfiguration.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    self_address: Arc<str>,
    peers: Arc<RwLock<Arc<[String]>>>,
}

impl PeerRegistry {
    pub fn new(
        self_address: impl Into<String>,
        peers: impl IntoIterator<Item = String>,
    ) -> Result<Self, RegistryError> {
        let self_address: Arc<str> = Arc::from(self_address.into());
        let peers = normalize(&self_address, peers)?;
        Ok(Self {
            self_address,
            peers: Arc::new(RwLock::new(peers)),
        })
    }

    /// A registry with no peers; every task runs locally.
    pub fn empty(self_address: impl Into<String>) -> Self {
        Self {
            self_address: Arc::from(self_address.into()),
            peers: Arc::new(RwLock::new(Arc::from(Vec::new()))),
        }
    }

    /// Current peer list.
    pub fn peers(&self) -> Arc<[String]> {
        let guard = self.peers.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn len(&self) -> usize {
        self.peers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers().is_empty()
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }

    /// Swap in a new peer list (external reconfiguration).
    ///
    /// Decisions already in flight keep the list they started with.
    pub fn replace(&self, peers: impl IntoIterator<Item = String>) -> Result<(), RegistryError> {
        let peers = normalize(&self.self_address, peers)?;
        let count = peers.len();
        let mut guard = self.peers.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = peers;
        info!(peers = count, "peer registry reconfigured");
        Ok(())
    }
}

fn normalize(
    self_address: &str,
    peers: impl IntoIterator<Item = String>,
) -> Result<Arc<[String]>, RegistryError> {
    let mut out: Vec<String> = Vec::new();
    for peer in peers {
        let peer = peer.trim().to_string();
        if peer.is_empty() {
            return Err(RegistryError::EmptyAddress);
        }
        if peer == self_address {
            return Err(RegistryError::SelfAddress(peer));
        }
        if !out.contains(&peer) {
            out.push(peer);
        }
    }
    Ok(Arc::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_order_and_drops_duplicates() {
        let reg = PeerRegistry::new("10.0.0.1:7700", addrs(&["b:1", "a:1", "b:1"])).unwrap();
        assert_eq!(&*reg.peers(), &["b:1".to_string(), "a:1".to_string()]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn rejects_own_address() {
        let err = PeerRegistry::new("10.0.0.1:7700", addrs(&["10.0.0.1:7700"])).unwrap_err();
        assert_eq!(err, RegistryError::SelfAddress("10.0.0.1:7700".to_string()));
    }

    #[test]
    fn rejects_empty_address() {
        assert_eq!(
            PeerRegistry::new("a:1", addrs(&["  "])).unwrap_err(),
            RegistryError::EmptyAddress
        );
    }

    #[test]
    fn empty_registry() {
        let reg = PeerRegistry::empty("a:1");
        assert!(reg.is_empty());
        assert_eq!(reg.self_address(), "a:1");
    }

    #[test]
    fn replace_does_not_disturb_existing_snapshots() {
        let reg = PeerRegistry::new("self:1", addrs(&["a:1"])).unwrap();
        let before = reg.peers();

        reg.replace(addrs(&["b:1", "c:1"])).unwrap();

        assert_eq!(&*before, &["a:1".to_string()]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn replace_validates() {
        let reg = PeerRegistry::new("self:1", addrs(&["a:1"])).unwrap();
        assert!(reg.replace(addrs(&["self:1"])).is_err());
        assert_eq!(&*reg.peers(), &["a:1".to_string()]);
    }

    #[test]
    fn clones_share_the_list() {
        let reg = PeerRegistry::new("self:1", addrs(&["a:1"])).unwrap();
        let other = reg.clone();
        reg.replace(addrs(&["z:1"])).unwrap();
        assert_eq!(&*other.peers(), &["z:1".to_string()]);
    }
}
