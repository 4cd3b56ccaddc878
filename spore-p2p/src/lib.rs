pub mod codec;
pub mod config;
pub mod error;
pub mod in_memory;
pub mod peer_registry;
pub mod ports;
pub mod sizing;
pub mod tcp;

pub use config::P2pConfig;
pub use error::NetworkError;
pub use peer_registry::{PeerCommand, PeerEvent, PeerRegistry};
pub use ports::{MessageHandler, ReplySink, Transport};
pub use sizing::QuorumPolicy;
