//! Process-local network used to run several nodes inside one test.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use spore_common::Message;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::NetworkError;
use crate::ports::{MessageHandler, ReplySink, Transport};

#[derive(Default)]
pub struct InMemoryNetwork {
    handlers: RwLock<HashMap<String, Arc<dyn MessageHandler>>>,
}

impl InMemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, address: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.into(), handler);
    }

    /// Takes `address` off the network; later sends to it fail as unreachable.
    pub fn unregister(&self, address: &str) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(address)
            .is_some()
    }

    fn handler(&self, address: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
    }

    /// Transport for one node; replies to its sends land in `inbound`.
    pub fn transport(self: &Arc<Self>, inbound: mpsc::Sender<Message>) -> InMemoryTransport {
        InMemoryTransport {
            network: Arc::clone(self),
            inbound,
        }
    }
}

pub struct InMemoryTransport {
    network: Arc<InMemoryNetwork>,
    inbound: mpsc::Sender<Message>,
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, address: &str, message: Message) -> Result<(), NetworkError> {
        let handler = self
            .network
            .handler(address)
            .ok_or_else(|| NetworkError::Unreachable(address.to_string()))?;

        trace!(to = %address, kind = ?message.kind, "in-memory send");
        let (reply, mut replies) = ReplySink::channel();
        tokio::spawn(async move {
            handler.handle(message, reply).await;
        });

        let inbound = self.inbound.clone();
        tokio::spawn(async move {
            while let Some(answer) = replies.recv().await {
                if inbound.send(answer).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }
}
