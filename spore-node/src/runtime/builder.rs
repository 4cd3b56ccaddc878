use std::sync::Arc;

use spore_common::{Message, Result};
use spore_consensus::SporeEnv;
use spore_ledger::Ledger;
use spore_p2p::tcp::{TcpServer, TcpTransport};
use spore_p2p::{MessageHandler, PeerRegistry, Transport};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::dispatch::Node;
use crate::runtime::maestro::{self, Maestro};

/// Capacity of the channel that carries replies back into the node.
pub const INBOUND_CAPACITY: usize = 1024;

pub struct NodeRuntime {
    pub node: Arc<Node>,
    pub env: Arc<SporeEnv>,
    maestro: Arc<Maestro>,
    config: Config,
    shutdown_tx: watch::Sender<bool>,
}

impl NodeRuntime {
    /// Wires ledger, peer registry, environment and dispatcher around `transport`.
    ///
    /// `inbound` must be the receiving end of the channel `transport` delivers
    /// replies to. The ledger file is loaded when present.
    pub fn build(
        config: &Config,
        address: impl Into<String>,
        transport: Arc<dyn Transport>,
        inbound: mpsc::Receiver<Message>,
    ) -> Result<Self> {
        config.validate()?;
        let address = address.into();
        let settings = config.quorum_settings();

        let ledger = Arc::new(Ledger::new(settings.transaction_timeout));
        ledger.load(&config.ledger_file)?;

        let mut registry = PeerRegistry::new(address.clone(), config.max_peer_connections, config.quorum_policy());
        for peer in config.resolve_bootstrap_peers(&address)? {
            registry.add_peer(&peer);
        }
        info!(
            %address,
            peers = registry.len(),
            quorum = registry.quorum_size(),
            "🔄 node environment ready"
        );

        let env = Arc::new(SporeEnv::new(
            address,
            config.resolve_password()?,
            ledger,
            Arc::new(RwLock::new(registry)),
            transport,
            settings,
            config.random_seed,
        ));
        let node = Arc::new(Node::new(Arc::clone(&env), config.ledger_file.clone()));
        let maestro = Arc::new(Maestro::new(Arc::clone(&node)));
        tokio::spawn(Arc::clone(&maestro).run_inbound(inbound));

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            node,
            env,
            maestro,
            config: config.clone(),
            shutdown_tx,
        })
    }

    /// Builds a node talking TCP and binds its listener.
    pub async fn build_tcp(config: &Config) -> Result<(Self, TcpServer)> {
        let p2p = config.p2p_config();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let transport = Arc::new(TcpTransport::new(inbound_tx, p2p.connect_timeout(), p2p.reply_timeout()));
        let server = TcpServer::bind(&p2p.listen_addr).await?;
        let runtime = Self::build(config, p2p.advertised_addr, transport, inbound_rx)?;
        Ok((runtime, server))
    }

    pub fn handler(&self) -> Arc<dyn MessageHandler> {
        Arc::clone(&self.node) as Arc<dyn MessageHandler>
    }

    /// Introduces the node to its bootstrap peers and starts the refresh loop.
    pub async fn start_background(&self) -> JoinHandle<()> {
        maestro::introduce(&self.env).await;
        tokio::spawn(
            Arc::clone(&self.maestro).run_refresh(self.config.peer_refresh_interval(), self.shutdown_tx.subscribe()),
        )
    }

    /// Serves `server` until [`NodeRuntime::shutdown`] is called.
    pub fn serve(&self, server: TcpServer) -> JoinHandle<()> {
        tokio::spawn(server.run(self.handler(), self.shutdown_tx.subscribe()))
    }

    /// Stops listener and refresh loop and saves the ledger.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.node.save_ledger();
        info!("node stopped");
    }
}
