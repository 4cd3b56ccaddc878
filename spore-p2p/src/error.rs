use spore_common::SporeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Peer {0} is unreachable")]
    Unreachable(String),
    #[error("Timed out talking to {0}")]
    Timeout(String),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<NetworkError> for SporeError {
    fn from(e: NetworkError) -> Self {
        SporeError::Network(e.to_string())
    }
}
