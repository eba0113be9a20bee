use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a failure, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad invocation, caught before any I/O.
    Usage,
    /// Input outside the protocol limits, caught before allocation or device access.
    SizeViolation,
    /// Filesystem or device node access failure.
    Io,
    /// The privileged call itself failed.
    Device,
}

#[derive(Error, Debug)]
pub enum KeyblobError {
    #[error("invalid operation '{0}' (expected enc|dec)")]
    InvalidOperation(String),

    #[error("input of {len} bytes cannot exceed {max}")]
    InputTooLarge { len: usize, max: usize },

    #[error("key blob of {len} bytes is shorter than the {min} byte blob overhead")]
    MalformedBlob { len: usize, min: usize },

    #[error("key modifier must be exactly {expected} bytes, got {len}")]
    InvalidKeyModifier { len: usize, expected: usize },

    #[error("cannot read input {}", path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open device {}", path.display())]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot lock device {}", path.display())]
    DeviceLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("device ioctl failed: {errno}")]
    DeviceIoError { errno: nix::errno::Errno },

    #[error("output {} already exists", path.display())]
    OutputExists { path: PathBuf },

    #[error("cannot write output {}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request layout mismatch: {0}")]
    LayoutMismatch(String),
}

impl KeyblobError {
    pub fn class(&self) -> ErrorClass {
        match self {
            KeyblobError::InvalidOperation(_) | KeyblobError::InvalidKeyModifier { .. } => {
                ErrorClass::Usage
            }
            KeyblobError::InputTooLarge { .. } | KeyblobError::MalformedBlob { .. } => {
                ErrorClass::SizeViolation
            }
            KeyblobError::InputUnreadable { .. }
            | KeyblobError::DeviceUnavailable { .. }
            | KeyblobError::DeviceLock { .. }
            | KeyblobError::OutputExists { .. }
            | KeyblobError::OutputWrite { .. } => ErrorClass::Io,
            KeyblobError::DeviceIoError { .. } | KeyblobError::LayoutMismatch(_) => {
                ErrorClass::Device
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, KeyblobError>;
