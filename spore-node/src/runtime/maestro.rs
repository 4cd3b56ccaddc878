use std::sync::Arc;
use std::time::Duration;

use spore_common::{Message, MessageKind};
use spore_consensus::SporeEnv;
use spore_p2p::{PeerCommand, ReplySink};
use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{debug, info, warn};

use crate::dispatch::Node;

/// Background loops of a running node.
pub struct Maestro {
    node: Arc<Node>,
}

impl Maestro {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Dispatches replies that transports collected for this node's own sends.
    pub async fn run_inbound(self: Arc<Self>, mut inbound: mpsc::Receiver<Message>) {
        while let Some(message) = inbound.recv().await {
            self.node.dispatch(message, ReplySink::detached()).await;
        }
        debug!("inbound channel closed");
    }

    /// Every `interval`, introduces this node to one random peer.
    pub async fn run_refresh(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    refresh_once(self.node.env()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("peer refresh stopped");
    }
}

fn connection_request(env: &SporeEnv) -> Message {
    env.outbound(Message::new(MessageKind::ConnectionRequest))
}

/// Sends a `ConnectionRequest` to one random peer; an unreachable peer is dropped.
///
/// Returns the dropped peer, if any.
pub async fn refresh_once(env: &SporeEnv) -> Option<String> {
    let target = {
        let peers = env.peers.read().await;
        env.with_rng(|rng| peers.random_peer(rng))
    }?;

    match env.transport.send(&target, connection_request(env)).await {
        Ok(()) => {
            debug!(peer = %target, "refresh sent");
            None
        }
        Err(e) => {
            warn!(peer = %target, "peer unreachable, dropping: {}", e);
            let mut peers = env.peers.write().await;
            peers.handle_command(PeerCommand::Drop(target.clone()));
            Some(target)
        }
    }
}

/// Announces this node to every peer it knows at startup.
pub async fn introduce(env: &SporeEnv) -> usize {
    let targets = env.peers.read().await.snapshot();
    let mut reached = 0;
    for peer in targets {
        match env.transport.send(&peer, connection_request(env)).await {
            Ok(()) => reached += 1,
            Err(e) => {
                warn!(%peer, "bootstrap peer unreachable: {}", e);
                env.peers.write().await.handle_command(PeerCommand::Drop(peer));
            }
        }
    }
    info!(reached, "👋 introduced to bootstrap peers");
    reached
}
