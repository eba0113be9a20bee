//! Mode resolver: maps the operation token from the command line to an [`Operation`].

use std::fmt;
use std::str::FromStr;

use crate::error::KeyblobError;
use crate::request::{CAAM_KB_DECRYPT, CAAM_KB_ENCRYPT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Raw key in, key blob out.
    Wrap,
    /// Key blob in, raw key out.
    Unwrap,
}

impl Operation {
    /// ioctl request code submitted to the device for this operation.
    pub fn command_code(self) -> u32 {
        match self {
            Operation::Wrap => CAAM_KB_ENCRYPT,
            Operation::Unwrap => CAAM_KB_DECRYPT,
        }
    }

    /// Progress verb used in log lines.
    pub fn verb(self) -> &'static str {
        match self {
            Operation::Wrap => "encrypt",
            Operation::Unwrap => "decrypt",
        }
    }
}

impl FromStr for Operation {
    type Err = KeyblobError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "enc" | "wrap" => Ok(Operation::Wrap),
            "dec" | "unwrap" => Ok(Operation::Unwrap),
            other => Err(KeyblobError::InvalidOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Wrap => f.write_str("wrap"),
            Operation::Unwrap => f.write_str("unwrap"),
        }
    }
}
