use std::sync::Arc;

use spore_common::{Message, MessageKind, Transaction, TxKind, TxResult};
use spore_p2p::ReplySink;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::env::SporeEnv;
use crate::error::QuorumError;
use crate::quorum::evaluator::{evaluate, Member, Verdict};
use crate::quorum::pool::QuorumEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumPhase {
    Created,
    Locking,
    WaitingVotes,
    Committing,
    Done,
    Aborted,
}

impl QuorumPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, QuorumPhase::Done | QuorumPhase::Aborted)
    }
}

/// Registers a quorum for `transaction` and spawns its actor.
///
/// The client receives exactly one `TransactionResponse` through `client`.
pub fn start_quorum(
    env: &Arc<SporeEnv>,
    transaction: Transaction,
    client: ReplySink,
) -> Result<(), QuorumError> {
    if transaction.kind == TxKind::BalanceQuery {
        return Err(QuorumError::NotSettleable(transaction.id));
    }

    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    if !env.quorums.insert(transaction.id, inbox_tx) {
        return Err(QuorumError::AlreadyActive(transaction.id));
    }

    let quorum = TransactionQuorum::new(Arc::clone(env), transaction, client);
    tokio::spawn(quorum.run(inbox_rx));
    Ok(())
}

/// Coordinator of one in-flight transaction.
///
/// Votes, the deadline watchdog and the backoff timer all go through the
/// `select!` in [`TransactionQuorum::run`], so the member table is never
/// touched concurrently.
struct TransactionQuorum {
    env: Arc<SporeEnv>,
    transaction: Transaction,
    client: ReplySink,
    members: Vec<Member>,
    phase: QuorumPhase,
    started: Instant,
    deadline: Instant,
    retry_at: Option<Instant>,
    round: u32,
}

/// Resolves at `at`, or never when no backoff is armed.
async fn backoff_elapsed(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl TransactionQuorum {
    fn new(env: Arc<SporeEnv>, transaction: Transaction, client: ReplySink) -> Self {
        let started = Instant::now();
        let deadline = started + env.settings.transaction_timeout;
        let members = vec![Member::new(env.address.clone())];
        Self {
            env,
            transaction,
            client,
            members,
            phase: QuorumPhase::Created,
            started,
            deadline,
            retry_at: None,
            round: 0,
        }
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<QuorumEvent>) {
        self.start().await;

        while !self.phase.is_terminal() {
            let deadline = self.deadline;
            let retry_at = self.retry_at;
            tokio::select! {
                event = inbox.recv() => match event {
                    Some(QuorumEvent::Vote { member, result }) => self.tally_result(&member, result).await,
                    None => self.abort(TxResult::Fail),
                },
                _ = sleep_until(deadline) => self.expire(),
                _ = backoff_elapsed(retry_at) => {
                    self.retry_at = None;
                    self.lock().await;
                }
            }
        }
    }

    async fn start(&mut self) {
        let sampled = {
            let peers = self.env.peers.read().await;
            let size = peers.quorum_size();
            self.env.with_rng(|rng| peers.sample(size, rng))
        };
        self.members.extend(sampled.into_iter().map(Member::new));

        info!(
            tx = %self.transaction.id,
            kind = ?self.transaction.kind,
            members = self.members.len(),
            "quorum started"
        );
        self.lock().await;
    }

    /// Starts a voting round: local validate+lock, lock requests to every remote member.
    async fn lock(&mut self) {
        self.phase = QuorumPhase::Locking;
        self.round += 1;
        for member in &mut self.members {
            member.vote = None;
        }

        let local = self.env.ledger.validate_and_lock(&self.transaction);
        if !matches!(local, TxResult::Success | TxResult::Fail | TxResult::LockFail) {
            self.abort(local);
            return;
        }

        let request = self.env.outbound(Message::for_transaction(
            MessageKind::LockRequest,
            self.transaction.clone(),
        ));
        for member in self.members.iter().skip(1) {
            self.env.send_detached(member.address.clone(), request.clone());
        }

        debug!(tx = %self.transaction.id, round = self.round, %local, "lock round started");
        let me = self.env.address.clone();
        self.tally_result(&me, local).await;
    }

    async fn tally_result(&mut self, address: &str, result: TxResult) {
        if self.phase.is_terminal() {
            return;
        }
        let Some(member) = self.members.iter_mut().find(|m| m.address == address) else {
            debug!(tx = %self.transaction.id, from = %address, "vote from non-member ignored");
            return;
        };
        member.vote = Some(result);

        match evaluate(&mut self.members) {
            Verdict::Pending => self.phase = QuorumPhase::WaitingVotes,
            Verdict::Commit => self.commit().await,
            Verdict::Abort(reason) => self.abort(reason),
            Verdict::Retry { unlock } => {
                if unlock {
                    self.unlock();
                }
                self.schedule_retry();
            }
        }
    }

    fn schedule_retry(&mut self) {
        let wait = self.env.with_rng(|rng| self.env.settings.backoff(rng));
        let elapsed = self.started.elapsed();
        if elapsed + wait >= self.env.settings.transaction_timeout {
            self.abort(TxResult::TimeOut);
            return;
        }
        debug!(tx = %self.transaction.id, round = self.round, ?wait, "retrying after backoff");
        self.phase = QuorumPhase::Locking;
        self.retry_at = Some(Instant::now() + wait);
    }

    /// Deadline watchdog. The backoff timer never outlives it, so the
    /// remaining time after a retry is always covered.
    fn expire(&mut self) {
        warn!(tx = %self.transaction.id, round = self.round, "⏱️ transaction timed out");
        self.abort(TxResult::TimeOut);
    }

    /// Clears pending votes and releases this transaction's locks everywhere.
    fn unlock(&mut self) {
        for member in &mut self.members {
            member.vote = None;
        }
        self.env.ledger.unlock(&self.transaction);

        let request = self.env.outbound(Message::for_transaction(
            MessageKind::UnlockRequest,
            self.transaction.clone(),
        ));
        for member in self.members.iter().skip(1) {
            self.env.send_detached(member.address.clone(), request.clone());
        }
    }

    fn finish(&mut self, phase: QuorumPhase) {
        self.phase = phase;
        self.retry_at = None;
        self.env.quorums.remove(&self.transaction.id);
    }

    async fn commit(&mut self) {
        self.finish(QuorumPhase::Committing);
        self.unlock();

        let result = self.env.ledger.commit(&self.transaction);
        if result.is_success() {
            let request = self.env.outbound(Message::for_transaction(
                MessageKind::CommitRequest,
                self.transaction.clone(),
            ));
            let fanout = self.env.broadcast(&request, None).await;
            info!(
                tx = %self.transaction.id,
                rounds = self.round,
                peers = fanout,
                "✅ transaction committed"
            );
        }

        self.phase = QuorumPhase::Done;
        self.respond(result);
    }

    fn abort(&mut self, reason: TxResult) {
        self.finish(QuorumPhase::Aborted);
        self.unlock();
        info!(tx = %self.transaction.id, rounds = self.round, %reason, "transaction aborted");
        self.respond(reason);
    }

    fn respond(&self, result: TxResult) {
        let response = Message::for_transaction(MessageKind::TransactionResponse, self.transaction.clone())
            .with_sender(self.env.address.clone())
            .with_result(result);
        if let Err(e) = self.client.send(response) {
            debug!(tx = %self.transaction.id, "client gone before response: {}", e);
        }
    }
}
