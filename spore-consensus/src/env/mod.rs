pub mod runtime;

pub use runtime::{QuorumSettings, SporeEnv};
