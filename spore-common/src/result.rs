use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome codes exchanged between nodes and reported to clients.
///
/// Messages carry the variant name (`"LockFail"`); [`TxResult::code`] gives
/// the numeric code 0..5 for logs and tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TxResult {
    #[default]
    Success = 0,
    /// An input could not be resolved. Possibly a double spend, possibly just not replicated yet.
    Fail = 1,
    /// Malformed transaction or bad signature. Never retried.
    Invalid = 2,
    /// Another transaction holds a lock on one of the inputs.
    LockFail = 3,
    /// The outputs are already applied.
    Duplicate = 4,
    TimeOut = 5,
}

impl TxResult {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Fail),
            2 => Some(Self::Invalid),
            3 => Some(Self::LockFail),
            4 => Some(Self::Duplicate),
            5 => Some(Self::TimeOut),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for TxResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
            Self::Invalid => "INVALID",
            Self::LockFail => "LOCK_FAIL",
            Self::Duplicate => "DUPLICATE",
            Self::TimeOut => "TIME_OUT",
        };
        f.write_str(name)
    }
}
