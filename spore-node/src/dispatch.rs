//! Inbound message dispatcher.
//!
//! [`Node`] is the [`MessageHandler`] every transport feeds. It checks the
//! network password, routes each message kind to the ledger, the peer
//! registry or the quorum table, and answers on the connection's
//! [`ReplySink`] for kinds that expect a reply.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use spore_common::{Message, MessageKind, Transaction, TxKind, TxResult};
use spore_consensus::{start_quorum, QuorumError, SporeEnv};
use spore_p2p::{MessageHandler, PeerCommand, PeerEvent, ReplySink};
use tracing::{debug, error, info, warn};

pub struct Node {
    env: Arc<SporeEnv>,
    ledger_file: PathBuf,
}

impl Node {
    pub fn new(env: Arc<SporeEnv>, ledger_file: impl Into<PathBuf>) -> Self {
        Self {
            env,
            ledger_file: ledger_file.into(),
        }
    }

    pub fn env(&self) -> &Arc<SporeEnv> {
        &self.env
    }

    pub fn ledger_file(&self) -> &PathBuf {
        &self.ledger_file
    }

    fn answer(&self, reply: &ReplySink, message: Message) {
        let kind = message.kind;
        if let Err(e) = reply.send(message) {
            debug!(?kind, "reply dropped: {}", e);
        }
    }

    pub async fn dispatch(&self, message: Message, reply: ReplySink) {
        if message.kind.requires_password() && !self.env.authorized(message.password.as_deref()) {
            error!(
                kind = ?message.kind,
                sender = message.sender.as_deref().unwrap_or("?"),
                "🔒 unauthorized message dropped"
            );
            return;
        }

        match message.kind {
            MessageKind::TransactionRequest => self.on_transaction_request(message, reply),
            MessageKind::LockRequest => self.on_lock_request(message, reply).await,
            MessageKind::LockResponse => self.on_lock_response(message),
            MessageKind::UnlockRequest => self.on_unlock_request(message).await,
            MessageKind::CommitRequest => self.on_commit_request(message).await,
            MessageKind::ConnectionRequest => self.on_connection_request(message, reply).await,
            MessageKind::ConnectionResponse => self.on_connection_response(message).await,
            MessageKind::CensusRequest => self.on_census_request(message, reply).await,
            MessageKind::LoadLedgerRequest => self.load_ledger(),
            MessageKind::SaveLedgerRequest => self.save_ledger(),
            MessageKind::ClearLedgerRequest => self.env.ledger.clear(),
            MessageKind::TransactionResponse | MessageKind::CensusResponse => {
                debug!(kind = ?message.kind, "response without a pending request ignored");
            }
        }
    }

    fn on_transaction_request(&self, message: Message, reply: ReplySink) {
        let Some(tx) = message.transaction.clone() else {
            warn!("transaction request without a transaction");
            self.answer(&reply, self.transaction_response(&message, None, TxResult::Fail));
            return;
        };

        if let Err(e) = tx.check_format() {
            info!(tx = %tx.id, "rejecting malformed transaction: {}", e);
            self.answer(&reply, self.transaction_response(&message, Some(tx), TxResult::Fail));
            return;
        }

        match tx.kind {
            TxKind::BalanceQuery => {
                let answered = self.env.ledger.answer_balance_query(&tx);
                self.answer(&reply, self.transaction_response(&message, Some(answered), TxResult::Success));
            }
            TxKind::Mint if !self.env.authorized(message.password.as_deref()) => {
                warn!(tx = %tx.id, "🔒 mint with wrong password refused");
                self.answer(&reply, self.transaction_response(&message, Some(tx), TxResult::Fail));
            }
            _ => {
                let id = tx.id;
                match start_quorum(&self.env, tx.clone(), reply.clone()) {
                    Ok(()) => {}
                    Err(QuorumError::AlreadyActive(_)) => {
                        info!(tx = %id, "transaction already in flight");
                        self.answer(&reply, self.transaction_response(&message, Some(tx), TxResult::Fail));
                    }
                    Err(e) => {
                        warn!(tx = %id, "quorum not started: {}", e);
                        self.answer(&reply, self.transaction_response(&message, Some(tx), TxResult::Fail));
                    }
                }
            }
        }
    }

    fn transaction_response(&self, request: &Message, tx: Option<Transaction>, result: TxResult) -> Message {
        let mut response = request.reply(MessageKind::TransactionResponse, result);
        if tx.is_some() {
            response.transaction = tx;
        }
        response.with_sender(self.env.address.clone())
    }

    async fn on_lock_request(&self, message: Message, reply: ReplySink) {
        let Some(tx) = message.transaction.as_ref() else {
            warn!("lock request without a transaction");
            return;
        };

        let result = if self.env.is_known_peer(message.sender.as_deref()).await {
            self.env.ledger.validate_and_lock(tx)
        } else {
            warn!(
                tx = %tx.id,
                sender = message.sender.as_deref().unwrap_or("?"),
                "lock request from unknown peer"
            );
            TxResult::Invalid
        };

        debug!(tx = %tx.id, %result, "voting");
        self.answer(&reply, self.env.outbound(message.reply(MessageKind::LockResponse, result)));
    }

    fn on_lock_response(&self, message: Message) {
        let (Some(id), Some(sender)) = (message.id, message.sender) else {
            warn!("lock response without id or sender");
            return;
        };
        if !self.env.quorums.deliver(&id, sender.clone(), message.result) {
            debug!(tx = %id, from = %sender, "late vote, quorum already settled");
        }
    }

    async fn on_unlock_request(&self, message: Message) {
        if !self.env.is_known_peer(message.sender.as_deref()).await {
            warn!(sender = message.sender.as_deref().unwrap_or("?"), "unlock from unknown peer ignored");
            return;
        }
        if let Some(tx) = &message.transaction {
            self.env.ledger.unlock(tx);
        }
    }

    async fn on_commit_request(&self, message: Message) {
        if !self.env.is_known_peer(message.sender.as_deref()).await {
            warn!(sender = message.sender.as_deref().unwrap_or("?"), "commit from unknown peer ignored");
            return;
        }
        let Some(tx) = message.transaction.clone() else {
            return;
        };

        self.env.ledger.unlock(&tx);
        if self.env.ledger.commit(&tx).is_success() {
            let forward = self.env.outbound(Message::for_transaction(MessageKind::CommitRequest, tx));
            let origin = message.sender.as_deref();
            let fanout = self.env.broadcast(&forward, origin).await;
            debug!(tx = ?message.id, peers = fanout, "commit propagated");
        }
    }

    async fn on_connection_request(&self, message: Message, reply: ReplySink) {
        let census = {
            let mut peers = self.env.peers.write().await;
            if let Some(sender) = &message.sender {
                match peers.handle_command(PeerCommand::Register(sender.clone())) {
                    PeerEvent::Registered(peer) => info!(%peer, total = peers.len(), "🤝 new peer"),
                    PeerEvent::Rejected(peer) => debug!(%peer, "peer not registered"),
                    _ => {}
                }
            }
            peers.census()
        };

        let response = self.env.outbound(
            Message::new(MessageKind::ConnectionResponse)
                .with_result(TxResult::Success)
                .with_peers(census),
        );
        self.answer(&reply, response);
    }

    async fn on_connection_response(&self, message: Message) {
        if message.result != TxResult::Success {
            return;
        }
        let mut listed = message.peers.unwrap_or_default();
        if let Some(sender) = message.sender {
            listed.push(sender);
        }
        let mut peers = self.env.peers.write().await;
        if let PeerEvent::Merged(added) = peers.handle_command(PeerCommand::Merge(listed)) {
            info!(added, total = peers.len(), quorum = peers.quorum_size(), "peer list merged");
        }
    }

    async fn on_census_request(&self, message: Message, reply: ReplySink) {
        let census = self.env.peers.read().await.census();
        let mut response = Message::new(MessageKind::CensusResponse)
            .with_sender(self.env.address.clone())
            .with_peers(census);
        response.id = message.id;
        self.answer(&reply, response);
    }

    pub fn load_ledger(&self) {
        if let Err(e) = self.env.ledger.load(&self.ledger_file) {
            error!("failed to load ledger from {}: {}", self.ledger_file.display(), e);
        }
    }

    pub fn save_ledger(&self) {
        if let Err(e) = self.env.ledger.save(&self.ledger_file) {
            error!("failed to save ledger to {}: {}", self.ledger_file.display(), e);
        }
    }
}

#[async_trait]
impl MessageHandler for Node {
    async fn handle(&self, message: Message, reply: ReplySink) {
        self.dispatch(message, reply).await;
    }
}
