use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::TxResult;
use crate::transactions::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    TransactionRequest,
    TransactionResponse,
    LockRequest,
    LockResponse,
    UnlockRequest,
    CommitRequest,
    ConnectionRequest,
    ConnectionResponse,
    CensusRequest,
    CensusResponse,
    LoadLedgerRequest,
    SaveLedgerRequest,
    ClearLedgerRequest,
}

impl MessageKind {
    /// Kinds that must carry the shared network password when one is configured.
    pub fn requires_password(self) -> bool {
        matches!(
            self,
            Self::LockRequest
                | Self::LockResponse
                | Self::UnlockRequest
                | Self::CommitRequest
                | Self::ConnectionRequest
                | Self::ConnectionResponse
                | Self::LoadLedgerRequest
                | Self::SaveLedgerRequest
                | Self::ClearLedgerRequest
        )
    }

    /// Kinds answered on the same connection.
    pub fn expects_reply(self) -> bool {
        matches!(
            self,
            Self::TransactionRequest | Self::LockRequest | Self::ConnectionRequest | Self::CensusRequest
        )
    }
}

/// Protocol envelope shared by clients and nodes.
///
/// `id` is the transaction id for transaction, lock, unlock and commit
/// traffic; votes are matched to quorums through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<String>>,
    #[serde(default)]
    pub result: TxResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Message {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            sender: None,
            id: None,
            transaction: None,
            peers: None,
            result: TxResult::Success,
            password: None,
        }
    }

    /// A message about `transaction`, with `id` set to the transaction id.
    pub fn for_transaction(kind: MessageKind, transaction: Transaction) -> Self {
        Self {
            id: Some(transaction.id),
            transaction: Some(transaction),
            ..Self::new(kind)
        }
    }

    pub fn transaction_request(transaction: Transaction) -> Self {
        Self::for_transaction(MessageKind::TransactionRequest, transaction)
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn with_result(mut self, result: TxResult) -> Self {
        self.result = result;
        self
    }

    pub fn with_peers(mut self, peers: Vec<String>) -> Self {
        self.peers = Some(peers);
        self
    }

    /// Response of `kind` keeping this message's id and transaction.
    pub fn reply(&self, kind: MessageKind, result: TxResult) -> Self {
        Self {
            kind,
            sender: None,
            id: self.id,
            transaction: self.transaction.clone(),
            peers: None,
            result,
            password: None,
        }
    }
}
