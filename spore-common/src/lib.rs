pub mod amount;
pub mod auth;
pub mod crypto;
pub mod error;
pub mod message;
pub mod result;
pub mod transactions;

pub use amount::Amount;
pub use crypto::{KeyHash, PublicKey};
pub use error::{Result, SporeError};
pub use message::{Message, MessageKind};
pub use result::TxResult;
pub use transactions::{Input, Output, Transaction, TxKind};
