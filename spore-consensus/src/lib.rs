pub mod env;
pub mod error;
pub mod quorum;

pub use env::{QuorumSettings, SporeEnv};
pub use error::QuorumError;
pub use quorum::{start_quorum, QuorumTable};
