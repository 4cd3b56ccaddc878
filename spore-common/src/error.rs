use thiserror::Error;

#[derive(Debug, Error)]
pub enum SporeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SporeError>;
