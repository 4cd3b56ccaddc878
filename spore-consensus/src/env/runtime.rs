use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spore_common::Message;
use spore_ledger::Ledger;
use spore_p2p::{PeerRegistry, Transport};
use tokio::sync::RwLock;
use tracing::warn;

use crate::quorum::pool::QuorumTable;

/// Timing of the lock/vote/retry protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumSettings {
    pub transaction_timeout: Duration,
    pub retry_min_wait: Duration,
    pub retry_max_wait: Duration,
}

impl Default for QuorumSettings {
    fn default() -> Self {
        Self {
            transaction_timeout: Duration::from_millis(10_000),
            retry_min_wait: Duration::from_millis(1_000),
            retry_max_wait: Duration::from_millis(5_000),
        }
    }
}

impl QuorumSettings {
    /// Uniform in `[retry_min_wait, retry_max_wait)`.
    pub fn backoff<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.retry_min_wait.as_millis() as u64;
        let max = self.retry_max_wait.as_millis() as u64;
        if max <= min {
            return self.retry_min_wait;
        }
        Duration::from_millis(rng.gen_range(min..max))
    }
}

/// Everything a message handler or a quorum needs from its node.
///
/// One per process; shared as `Arc<SporeEnv>`.
pub struct SporeEnv {
    /// This node's advertised address, used as `sender` and as member 0 of its quorums.
    pub address: String,
    password: Option<String>,
    pub ledger: Arc<Ledger>,
    pub peers: Arc<RwLock<PeerRegistry>>,
    pub transport: Arc<dyn Transport>,
    pub quorums: QuorumTable,
    pub settings: QuorumSettings,
    rng: Mutex<StdRng>,
}

impl SporeEnv {
    pub fn new(
        address: impl Into<String>,
        password: Option<String>,
        ledger: Arc<Ledger>,
        peers: Arc<RwLock<PeerRegistry>>,
        transport: Arc<dyn Transport>,
        settings: QuorumSettings,
        seed: u64,
    ) -> Self {
        Self {
            address: address.into(),
            password: password.filter(|p| !p.is_empty()),
            ledger,
            peers,
            transport,
            quorums: QuorumTable::new(),
            settings,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Open when no password is configured, otherwise an exact match is required.
    pub fn authorized(&self, candidate: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => candidate == Some(expected.as_str()),
        }
    }

    /// Stamps `message` with this node's address and the network password.
    pub fn outbound(&self, message: Message) -> Message {
        message
            .with_sender(self.address.clone())
            .with_password(self.password.clone())
    }

    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    pub async fn is_known_peer(&self, address: Option<&str>) -> bool {
        match address {
            Some(address) => self.peers.read().await.knows(address),
            None => false,
        }
    }

    /// Fire-and-forget send; failures are only logged.
    pub fn send_detached(&self, address: String, message: Message) {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let kind = message.kind;
            if let Err(e) = transport.send(&address, message).await {
                warn!(peer = %address, ?kind, "⚠️ send failed: {}", e);
            }
        });
    }

    /// Sends a copy of `message` to every known peer except `except`.
    ///
    /// Returns the number of peers addressed.
    pub async fn broadcast(&self, message: &Message, except: Option<&str>) -> usize {
        let targets = self.peers.read().await.snapshot();
        let mut sent = 0;
        for peer in targets {
            if Some(peer.as_str()) == except {
                continue;
            }
            self.send_detached(peer, message.clone());
            sent += 1;
        }
        sent
    }
}
