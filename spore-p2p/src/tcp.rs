//! TCP transport: one length-delimited JSON frame per message.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use spore_common::Message;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, warn};

use crate::codec::{decode, encode, frame_codec};
use crate::error::NetworkError;
use crate::ports::{MessageHandler, ReplySink, Transport};

pub struct TcpTransport {
    inbound: mpsc::Sender<Message>,
    connect_timeout: Duration,
    reply_timeout: Duration,
}

impl TcpTransport {
    pub fn new(inbound: mpsc::Sender<Message>, connect_timeout: Duration, reply_timeout: Duration) -> Self {
        Self {
            inbound,
            connect_timeout,
            reply_timeout,
        }
    }
}

async fn connect(address: &str, wait: Duration) -> Result<Framed<TcpStream, LengthDelimitedCodec>, NetworkError> {
    let stream = timeout(wait, TcpStream::connect(address))
        .await
        .map_err(|_| NetworkError::Timeout(address.to_string()))?
        .map_err(|e| {
            debug!(peer = %address, "connect failed: {}", e);
            NetworkError::Unreachable(address.to_string())
        })?;
    stream.set_nodelay(true)?;
    Ok(Framed::new(stream, frame_codec()))
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, address: &str, message: Message) -> Result<(), NetworkError> {
        let mut framed = connect(address, self.connect_timeout).await?;
        let expects_reply = message.kind.expects_reply();
        framed.send(Bytes::from(encode(&message)?)).await?;

        if !expects_reply {
            return Ok(());
        }

        // The answer is matched later by message id, so read it off the critical path.
        let inbound = self.inbound.clone();
        let wait = self.reply_timeout;
        let peer = address.to_string();
        tokio::spawn(async move {
            match timeout(wait, framed.next()).await {
                Ok(Some(Ok(frame))) => match decode(&frame) {
                    Ok(reply) => {
                        if inbound.send(reply).await.is_err() {
                            debug!(peer = %peer, "inbound channel closed, reply dropped");
                        }
                    }
                    Err(e) => warn!(peer = %peer, "undecodable reply: {}", e),
                },
                Ok(Some(Err(e))) => warn!(peer = %peer, "reply read failed: {}", e),
                Ok(None) => debug!(peer = %peer, "connection closed without reply"),
                Err(_) => debug!(peer = %peer, "no reply within {:?}", wait),
            }
        });
        Ok(())
    }
}

/// One request, one reply. Used by clients and tools talking to a node.
pub async fn request(address: &str, message: Message, wait: Duration) -> Result<Message, NetworkError> {
    let mut framed = connect(address, wait).await?;
    framed.send(Bytes::from(encode(&message)?)).await?;
    match timeout(wait, framed.next()).await {
        Ok(Some(Ok(frame))) => decode(&frame),
        Ok(Some(Err(e))) => Err(e.into()),
        Ok(None) => Err(NetworkError::ConnectionClosed),
        Err(_) => Err(NetworkError::Timeout(address.to_string())),
    }
}

pub struct TcpServer {
    listener: TcpListener,
}

impl TcpServer {
    pub async fn bind(addr: &str) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` flips to `true`.
    pub async fn run(self, handler: Arc<dyn MessageHandler>, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("🌐 listening on {}", addr);
        }
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let handler = Arc::clone(&handler);
                        tokio::spawn(serve_connection(stream, peer, handler));
                    }
                    Err(e) => warn!("accept failed: {}", e),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("listener stopped");
                        break;
                    }
                }
            }
        }
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, handler: Arc<dyn MessageHandler>) {
    let _ = stream.set_nodelay(true);
    let (mut sink, mut frames) = Framed::new(stream, frame_codec()).split();
    let (reply, mut replies) = ReplySink::channel();

    // Writer lives until every clone of `reply` is gone, so a quorum can
    // still answer after this connection stops reading.
    tokio::spawn(async move {
        while let Some(message) = replies.recv().await {
            let bytes = match encode(&message) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(%peer, "failed to encode reply: {}", e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Bytes::from(bytes)).await {
                debug!(%peer, "reply not delivered: {}", e);
                break;
            }
        }
    });

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(bytes) => match decode(&bytes) {
                Ok(message) => handler.handle(message, reply.clone()).await,
                Err(e) => warn!(%peer, "dropping undecodable frame: {}", e),
            },
            Err(e) => {
                debug!(%peer, "connection error: {}", e);
                break;
            }
        }
    }
}
