use std::collections::HashSet;

use thiserror::Error;

use super::types::{Transaction, TxKind};

/// Structural problems detectable without a ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("transaction has no outputs")]
    NoOutputs,
    #[error("mint must not carry inputs")]
    MintWithInputs,
    #[error("payment has no inputs")]
    NoInputs,
    #[error("input {0} has an empty signature")]
    UnsignedInput(usize),
    #[error("key hash {0} is spent twice")]
    RepeatedInput(u64),
    #[error("output id {0} appears twice")]
    RepeatedOutput(uuid::Uuid),
}

impl Transaction {
    /// Stateless shape checks:
    /// 1. At least one output, all output ids distinct.
    /// 2. Mints have no inputs.
    /// 3. Payments have at least one input, each signed, none repeated.
    pub fn check_format(&self) -> Result<(), FormatError> {
        // 1. Outputs
        if self.outputs.is_empty() {
            return Err(FormatError::NoOutputs);
        }
        let mut ids = HashSet::new();
        for output in &self.outputs {
            if !ids.insert(output.id) {
                return Err(FormatError::RepeatedOutput(output.id));
            }
        }

        match self.kind {
            // 2. Mint
            TxKind::Mint if !self.inputs.is_empty() => Err(FormatError::MintWithInputs),
            // 3. Payment
            TxKind::Payment => {
                if self.inputs.is_empty() {
                    return Err(FormatError::NoInputs);
                }
                let mut spent = HashSet::new();
                for (i, input) in self.inputs.iter().enumerate() {
                    if input.signature.is_empty() {
                        return Err(FormatError::UnsignedInput(i));
                    }
                    if !spent.insert(input.key_hash) {
                        return Err(FormatError::RepeatedInput(input.key_hash));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn valid_format(&self) -> bool {
        self.check_format().is_ok()
    }
}
