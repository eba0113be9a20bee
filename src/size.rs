//! Size policy: admission control for the fixed protocol limits.
//!
//! Every length that crosses the device boundary is checked here before any
//! buffer is allocated or the device is touched.

use crate::error::{KeyblobError, Result};
use crate::mode::Operation;

/// Space taken in every blob by the blob key encryption key and MAC tag (32 + 16).
pub const BLOB_OVERHEAD: usize = 32 + 16;

/// Largest blob the driver accepts.
pub const MAX_KEYBLOB_LEN: usize = 65535;

/// Largest raw key that still fits in a blob.
pub const MAX_RAWKEY_LEN: usize = MAX_KEYBLOB_LEN - BLOB_OVERHEAD;

/// Length of the key modifier concatenated with the master key.
pub const KEYMOD_LEN: usize = 16;

/// Blob length produced by wrapping `clear_len` bytes.
pub fn for_wrap(clear_len: usize) -> Result<usize> {
    if clear_len > MAX_RAWKEY_LEN {
        return Err(KeyblobError::InputTooLarge {
            len: clear_len,
            max: MAX_RAWKEY_LEN,
        });
    }
    Ok(clear_len + BLOB_OVERHEAD)
}

/// Clear length recovered by unwrapping a blob of `blob_len` bytes.
pub fn for_unwrap(blob_len: usize) -> Result<usize> {
    if blob_len > MAX_KEYBLOB_LEN {
        return Err(KeyblobError::InputTooLarge {
            len: blob_len,
            max: MAX_KEYBLOB_LEN,
        });
    }
    blob_len
        .checked_sub(BLOB_OVERHEAD)
        .ok_or(KeyblobError::MalformedBlob {
            len: blob_len,
            min: BLOB_OVERHEAD,
        })
}

/// Validated buffer lengths for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePlan {
    pub clear_len: usize,
    pub blob_len: usize,
}

impl SizePlan {
    /// Derive both lengths from the length of the operation's input.
    pub fn for_input(op: Operation, input_len: usize) -> Result<Self> {
        match op {
            Operation::Wrap => Ok(Self {
                clear_len: input_len,
                blob_len: for_wrap(input_len)?,
            }),
            Operation::Unwrap => Ok(Self {
                clear_len: for_unwrap(input_len)?,
                blob_len: input_len,
            }),
        }
    }

    /// Length of the buffer the device fills in.
    pub fn output_len(&self, op: Operation) -> usize {
        match op {
            Operation::Wrap => self.blob_len,
            Operation::Unwrap => self.clear_len,
        }
    }
}
