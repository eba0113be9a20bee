//! Device channel: exclusive access to the CAAM key blob device node.
//!
//! The node is opened read/write and locked with `flock(2)` so cooperating
//! processes never have two requests in flight on the single hardware engine.
//! The lock is held by a [`LockedDevice`] and released exactly once, either
//! explicitly through [`LockedDevice::release`] or when the guard is dropped.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use nix::ioctl_readwrite;
use tracing::{debug, warn};

use crate::error::{KeyblobError, Result};
use crate::mode::Operation;
use crate::request::{
    CaamKbData, KeyBlobRequest, CAAM_KB_DECRYPT_NR, CAAM_KB_ENCRYPT_NR, CAAM_KB_MAGIC,
};

/// Well-known device node exposed by the `caam_keyblob` kernel module.
pub const CAAM_DEV: &str = "/dev/caam_kb";

ioctl_readwrite!(caam_kb_encrypt, CAAM_KB_MAGIC, CAAM_KB_ENCRYPT_NR, CaamKbData);
ioctl_readwrite!(caam_kb_decrypt, CAAM_KB_MAGIC, CAAM_KB_DECRYPT_NR, CaamKbData);

/// A locked device that accepts wrap/unwrap submissions.
///
/// `submit` blocks until the engine completes. Implementations release their
/// lock on drop.
pub trait KeyBlobDevice {
    fn submit(&mut self, op: Operation, request: &mut KeyBlobRequest<'_>) -> Result<()>;
}

/// Source of exclusively locked devices.
pub trait DeviceChannel {
    type Device: KeyBlobDevice;

    /// Open the device and take the exclusive lock, blocking until it is free.
    fn acquire(&self) -> Result<Self::Device>;
}

/// Channel backed by a real device node.
#[derive(Debug, Clone)]
pub struct CaamChannel {
    path: PathBuf,
}

impl CaamChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for CaamChannel {
    fn default() -> Self {
        Self::new(CAAM_DEV)
    }
}

impl DeviceChannel for CaamChannel {
    type Device = LockedDevice;

    fn acquire(&self) -> Result<LockedDevice> {
        CaamDevice::open(&self.path)?.lock_exclusive()
    }
}

/// Open, unlocked handle to the device node.
#[derive(Debug)]
pub struct CaamDevice {
    file: File,
    path: PathBuf,
}

impl CaamDevice {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| KeyblobError::DeviceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("opened {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Take an advisory exclusive lock, waiting for other holders.
    pub fn lock_exclusive(self) -> Result<LockedDevice> {
        FileExt::lock_exclusive(&self.file).map_err(|source| KeyblobError::DeviceLock {
            path: self.path.clone(),
            source,
        })?;
        debug!("locked {}", self.path.display());
        Ok(LockedDevice {
            file: Some(self.file),
            path: self.path,
        })
    }
}

/// Device node held under an exclusive lock.
#[derive(Debug)]
pub struct LockedDevice {
    file: Option<File>,
    path: PathBuf,
}

impl LockedDevice {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.file.is_none()
    }

    /// Unlock and close the node. Later calls, and the drop, are no-ops.
    pub fn release(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let unlocked = FileExt::unlock(&file).map_err(|source| KeyblobError::DeviceLock {
            path: self.path.clone(),
            source,
        });
        // closing the descriptor drops the flock even if unlock failed
        drop(file);
        debug!("released {}", self.path.display());
        unlocked
    }
}

impl KeyBlobDevice for LockedDevice {
    fn submit(&mut self, op: Operation, request: &mut KeyBlobRequest<'_>) -> Result<()> {
        let file = self.file.as_ref().ok_or(KeyblobError::DeviceIoError {
            errno: nix::errno::Errno::EBADF,
        })?;
        let fd = file.as_raw_fd();
        let data = request.as_raw_mut();

        // SAFETY: `data` points at a caam_kb_data whose layout is asserted in
        // `request`, and its buffer pointers are borrowed by `request` for the
        // whole call. The driver writes at most the declared lengths.
        let res = unsafe {
            match op {
                Operation::Wrap => caam_kb_encrypt(fd, data),
                Operation::Unwrap => caam_kb_decrypt(fd, data),
            }
        };

        res.map(|_| ())
            .map_err(|errno| KeyblobError::DeviceIoError { errno })
    }
}

impl Drop for LockedDevice {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}", e);
        }
    }
}
