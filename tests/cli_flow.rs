/// End-to-end tests for the run command with the device swapped for the
/// software stand-in. Cover the ordering guarantees: nothing is opened for a
/// bad operation, nothing is overwritten, nothing is written on failure.
mod common;

use std::path::{Path, PathBuf};

use caam_keyblob::cli::Cli;
use caam_keyblob::commands::run::run;
use caam_keyblob::size::MAX_RAWKEY_LEN;
use caam_keyblob::{ErrorClass, KeyblobError};
use clap::Parser;
use common::RecordingChannel;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["caam-tool"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("arguments should parse")
}

fn path_str(p: &Path) -> &str {
    p.to_str().expect("temp paths are UTF-8")
}

fn keyblob_error(err: &anyhow::Error) -> &KeyblobError {
    err.downcast_ref::<KeyblobError>()
        .unwrap_or_else(|| panic!("expected a KeyblobError, got: {:#}", err))
}

#[test]
fn test_unknown_operation_never_opens_device() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("key.bin");
    let output = dir.path().join("blob.bin");
    std::fs::write(&input, b"HELLO").unwrap();

    let channel = RecordingChannel::default();
    let mut opened_for: Option<PathBuf> = None;
    let err = run(
        &cli(&["seal", path_str(&input), path_str(&output)]),
        |device: &Path| {
            opened_for = Some(device.to_path_buf());
            channel.clone()
        },
    )
    .unwrap_err();

    let err = keyblob_error(&err);
    assert!(matches!(err, KeyblobError::InvalidOperation(ref t) if t == "seal"));
    assert_eq!(err.class(), ErrorClass::Usage);
    assert!(opened_for.is_none());
    assert_eq!(channel.acquired(), 0);
    assert!(!output.exists());
}

#[test]
fn test_wrap_then_unwrap_files() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let key = dir.path().join("key.bin");
    let blob = dir.path().join("blob.bin");
    let recovered = dir.path().join("recovered.bin");
    std::fs::write(&key, b"HELLO").unwrap();

    let channel = RecordingChannel::default();
    run(&cli(&["enc", path_str(&key), path_str(&blob)]), |_: &Path| {
        channel.clone()
    })
    .expect("wrap should succeed");
    assert_eq!(std::fs::metadata(&blob).unwrap().len(), 53);

    run(
        &cli(&["dec", path_str(&blob), path_str(&recovered)]),
        |_: &Path| channel.clone(),
    )
    .expect("unwrap should succeed");
    assert_eq!(std::fs::read(&recovered).unwrap(), b"HELLO");
    assert_eq!(channel.submitted(), 2);
    assert_eq!(channel.released(), 2);
}

#[test]
fn test_device_flag_reaches_channel() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("key.bin");
    let output = dir.path().join("blob.bin");
    std::fs::write(&input, b"k").unwrap();

    let channel = RecordingChannel::default();
    let mut opened_for: Option<PathBuf> = None;
    run(
        &cli(&[
            "--device",
            "/dev/caam_kb_test",
            "wrap",
            path_str(&input),
            path_str(&output),
        ]),
        |device: &Path| {
            opened_for = Some(device.to_path_buf());
            channel.clone()
        },
    )
    .unwrap();
    assert_eq!(opened_for, Some(PathBuf::from("/dev/caam_kb_test")));
}

#[test]
fn test_existing_output_is_untouched() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("key.bin");
    let output = dir.path().join("blob.bin");
    std::fs::write(&input, b"HELLO").unwrap();
    std::fs::write(&output, b"existing blob").unwrap();

    let channel = RecordingChannel::default();
    let err = run(
        &cli(&["enc", path_str(&input), path_str(&output)]),
        |_: &Path| channel.clone(),
    )
    .unwrap_err();

    assert!(matches!(
        keyblob_error(&err),
        KeyblobError::OutputExists { .. }
    ));
    assert_eq!(std::fs::read(&output).unwrap(), b"existing blob");
    assert_eq!(channel.acquired(), 0, "pre-check must run before the device");
}

#[test]
fn test_oversized_input_no_device_no_output() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("key.bin");
    let output = dir.path().join("blob.bin");
    std::fs::write(&input, vec![0u8; MAX_RAWKEY_LEN + 1]).unwrap();

    let channel = RecordingChannel::default();
    let err = run(
        &cli(&["enc", path_str(&input), path_str(&output)]),
        |_: &Path| channel.clone(),
    )
    .unwrap_err();

    let err = keyblob_error(&err);
    assert!(matches!(err, KeyblobError::InputTooLarge { .. }));
    assert_eq!(err.class(), ErrorClass::SizeViolation);
    assert_eq!(channel.acquired(), 0);
    assert!(!output.exists());
}

#[test]
fn test_short_blob_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("blob.bin");
    let output = dir.path().join("key.bin");
    std::fs::write(&input, [0u8; 47]).unwrap();

    let channel = RecordingChannel::default();
    let err = run(
        &cli(&["dec", path_str(&input), path_str(&output)]),
        |_: &Path| channel.clone(),
    )
    .unwrap_err();

    assert!(matches!(
        keyblob_error(&err),
        KeyblobError::MalformedBlob { len: 47, min: 48 }
    ));
    assert_eq!(channel.acquired(), 0);
    assert!(!output.exists());
}

#[test]
fn test_device_failure_leaves_no_output() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("blob.bin");
    let output = dir.path().join("key.bin");
    // right size, wrong frame: the framing device rejects it
    std::fs::write(&input, [0u8; 60]).unwrap();

    let channel = RecordingChannel::default();
    let err = run(
        &cli(&["dec", path_str(&input), path_str(&output)]),
        |_: &Path| channel.clone(),
    )
    .unwrap_err();

    let err = keyblob_error(&err);
    assert_eq!(err.class(), ErrorClass::Device);
    assert_eq!(channel.released(), 1);
    assert!(!output.exists());
}

#[test]
fn test_key_modifier_file_validated() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("key.bin");
    let output = dir.path().join("blob.bin");
    let keymod = dir.path().join("keymod.bin");
    std::fs::write(&input, b"HELLO").unwrap();
    std::fs::write(&keymod, [1u8; 8]).unwrap();

    let channel = RecordingChannel::default();
    let err = run(
        &cli(&[
            "--keymod",
            path_str(&keymod),
            "enc",
            path_str(&input),
            path_str(&output),
        ]),
        |_: &Path| channel.clone(),
    )
    .unwrap_err();

    assert!(matches!(
        keyblob_error(&err),
        KeyblobError::InvalidKeyModifier { len: 8, .. }
    ));
    assert_eq!(channel.acquired(), 0);
}
