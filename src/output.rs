//! Result writer: persists a transaction result without ever replacing an existing file.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::warn;

use crate::error::{KeyblobError, Result};

/// Mode for newly created output files; both blobs and raw keys are secrets.
const OUTPUT_MODE: u32 = 0o600;

/// Fail with `OutputExists` if anything, including a dangling symlink, sits at `path`.
pub fn ensure_absent(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Err(KeyblobError::OutputExists {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(KeyblobError::OutputWrite {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Create `path` exclusively, write `data` in full and sync it to storage.
///
/// A file that cannot be fully written and synced is removed again.
pub fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(OUTPUT_MODE)
        .open(path)
        .map_err(|source| {
            if source.kind() == ErrorKind::AlreadyExists {
                KeyblobError::OutputExists {
                    path: path.to_path_buf(),
                }
            } else {
                KeyblobError::OutputWrite {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

    if let Err(source) = file.write_all(data).and_then(|_| file.sync_all()) {
        drop(file);
        if let Err(e) = std::fs::remove_file(path) {
            warn!("cannot remove partial output {}: {}", path.display(), e);
        }
        return Err(KeyblobError::OutputWrite {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}
