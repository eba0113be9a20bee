//! Run configuration assembled from the command line.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::cli::Cli;
use crate::error::{KeyblobError, Result};
use crate::request::KeyModifier;
use crate::size::KEYMOD_LEN;

#[derive(Debug)]
pub struct Config {
    pub device: PathBuf,
    pub key_modifier: KeyModifier,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let key_modifier = match &cli.keymod {
            Some(path) => load_key_modifier(path)?,
            None => KeyModifier::zero(),
        };
        if key_modifier.is_zero() {
            warn!("using an all-zero key modifier");
        }
        Ok(Self {
            device: cli.device.clone(),
            key_modifier,
        })
    }
}

/// Read a key modifier from a raw file of exactly [`KEYMOD_LEN`] bytes.
pub fn load_key_modifier(path: &Path) -> Result<KeyModifier> {
    let bytes = zeroize::Zeroizing::new(std::fs::read(path).map_err(|source| {
        KeyblobError::InputUnreadable {
            path: path.to_path_buf(),
            source,
        }
    })?);
    if bytes.len() != KEYMOD_LEN {
        return Err(KeyblobError::InvalidKeyModifier {
            len: bytes.len(),
            expected: KEYMOD_LEN,
        });
    }
    KeyModifier::from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_modifier_is_zero() {
        let cli = Cli::try_parse_from(["caam-tool", "enc", "a", "b"]).unwrap();
        let config = Config::from_cli(&cli).unwrap();
        assert!(config.key_modifier.is_zero());
    }

    #[test]
    fn test_modifier_from_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("keymod");
        std::fs::write(&path, [0x42u8; 16]).unwrap();
        let keymod = load_key_modifier(&path).unwrap();
        assert_eq!(keymod.as_bytes(), &[0x42u8; 16]);
    }

    #[test]
    fn test_modifier_wrong_length() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("keymod");
        std::fs::write(&path, b"too short").unwrap();
        let err = load_key_modifier(&path).unwrap_err();
        assert!(matches!(
            err,
            KeyblobError::InvalidKeyModifier { len: 9, expected: 16 }
        ));
    }

    #[test]
    fn test_modifier_missing_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let err = load_key_modifier(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, KeyblobError::InputUnreadable { .. }));
    }
}
