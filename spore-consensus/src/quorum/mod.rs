//! Per-transaction quorums.
//!
//! A quorum is this node plus a random sample of its peers. Each member
//! validates and locks the transaction against its own ledger replica and
//! votes; the coordinator commits on unanimity, settles stable disagreement
//! by majority, and otherwise backs off and retries until the transaction
//! deadline.

pub mod engine;
pub mod evaluator;
pub mod pool;

pub use engine::{start_quorum, QuorumPhase};
pub use evaluator::{evaluate, Member, Verdict};
pub use pool::{QuorumEvent, QuorumTable};
