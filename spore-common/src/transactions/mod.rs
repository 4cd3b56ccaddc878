pub mod types;
pub mod validation;

pub use types::{Input, Output, Transaction, TxKind};
pub use validation::FormatError;
