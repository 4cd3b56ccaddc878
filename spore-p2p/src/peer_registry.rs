use std::collections::BTreeSet;

use rand::seq::IteratorRandom;
use rand::Rng;
use tracing::debug;

use crate::sizing::{quorum_size, QuorumPolicy};

pub enum PeerCommand {
    Register(String),
    Drop(String),
    /// Peer list received from another node.
    Merge(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Registered(String),
    AlreadyKnown(String),
    Rejected(String),
    Dropped(String),
    Merged(usize),
    NoChange,
}

/// Known peers of this node and the quorum size derived from them.
///
/// Shared as `Arc<RwLock<PeerRegistry>>`; membership changes and the quorum
/// size recomputation happen under the same write guard.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    self_address: String,
    peers: BTreeSet<String>,
    max_peers: usize,
    policy: QuorumPolicy,
    quorum_size: usize,
}

impl PeerRegistry {
    pub fn new(self_address: impl Into<String>, max_peers: usize, policy: QuorumPolicy) -> Self {
        let mut registry = Self {
            self_address: self_address.into(),
            peers: BTreeSet::new(),
            max_peers,
            policy,
            quorum_size: 0,
        };
        registry.recompute_quorum_size();
        registry
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }

    pub fn policy(&self) -> &QuorumPolicy {
        &self.policy
    }

    fn recompute_quorum_size(&mut self) {
        self.quorum_size = quorum_size(self.peers.len() + 1, &self.policy);
    }

    /// Adds `address` unless it is this node, already known, or the registry is full.
    pub fn add_peer(&mut self, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() || address == self.self_address || self.peers.contains(address) {
            return false;
        }
        if self.peers.len() >= self.max_peers {
            debug!(peer = %address, max = self.max_peers, "peer table full");
            return false;
        }
        self.peers.insert(address.to_string());
        self.recompute_quorum_size();
        true
    }

    pub fn remove_peer(&mut self, address: &str) -> bool {
        let removed = self.peers.remove(address);
        if removed {
            self.recompute_quorum_size();
        }
        removed
    }

    pub fn knows(&self, address: &str) -> bool {
        self.peers.contains(address)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn quorum_size(&self) -> usize {
        self.quorum_size
    }

    /// Copy of the peer set, safe to iterate while membership changes.
    pub fn snapshot(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    /// Peers plus this node, as advertised to others.
    pub fn census(&self) -> Vec<String> {
        let mut all = self.snapshot();
        all.push(self.self_address.clone());
        all
    }

    /// Up to `count` distinct peers chosen uniformly without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<String> {
        self.peers.iter().cloned().choose_multiple(rng, count)
    }

    pub fn random_peer<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        self.peers.iter().choose(rng).cloned()
    }

    pub fn handle_command(&mut self, cmd: PeerCommand) -> PeerEvent {
        match cmd {
            PeerCommand::Register(address) => {
                if self.knows(&address) {
                    PeerEvent::AlreadyKnown(address)
                } else if self.add_peer(&address) {
                    debug!(peer = %address, quorum = self.quorum_size, "peer registered");
                    PeerEvent::Registered(address)
                } else {
                    PeerEvent::Rejected(address)
                }
            }
            PeerCommand::Drop(address) => {
                if self.remove_peer(&address) {
                    debug!(peer = %address, quorum = self.quorum_size, "peer dropped");
                    PeerEvent::Dropped(address)
                } else {
                    PeerEvent::NoChange
                }
            }
            PeerCommand::Merge(addresses) => {
                let added = addresses.iter().filter(|a| self.add_peer(a)).count();
                if added == 0 {
                    PeerEvent::NoChange
                } else {
                    debug!(added, total = self.peers.len(), quorum = self.quorum_size, "merged peer list");
                    PeerEvent::Merged(added)
                }
            }
        }
    }
}
