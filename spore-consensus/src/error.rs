use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuorumError {
    #[error("a quorum for transaction {0} is already running")]
    AlreadyActive(Uuid),
    #[error("transaction {0} is a balance query and needs no quorum")]
    NotSettleable(Uuid),
}
