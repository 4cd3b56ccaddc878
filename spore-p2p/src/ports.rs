use async_trait::async_trait;
use spore_common::Message;
use tokio::sync::mpsc;

use crate::error::NetworkError;

/// Outbound side of the network as seen by the node.
///
/// `send` returns once the message is handed to the peer. Anything the peer
/// answers on that connection is delivered to the node's inbound channel,
/// not to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, address: &str, message: Message) -> Result<(), NetworkError>;
}

/// Inbound side: receives every message that arrives on a connection.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message, reply: ReplySink);
}

/// Write half of the connection a message arrived on.
///
/// Cloneable so a quorum can keep answering its client after the handler
/// returned. A detached sink belongs to messages that have no one to answer.
#[derive(Debug, Clone)]
pub struct ReplySink {
    tx: Option<mpsc::UnboundedSender<Message>>,
}

impl ReplySink {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn is_detached(&self) -> bool {
        self.tx.is_none()
    }

    pub fn send(&self, message: Message) -> Result<(), NetworkError> {
        match &self.tx {
            Some(tx) => tx.send(message).map_err(|_| NetworkError::ConnectionClosed),
            None => Err(NetworkError::ConnectionClosed),
        }
    }
}
