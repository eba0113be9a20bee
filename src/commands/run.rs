/// Run command: resolve the operation, move one buffer through the device,
/// and persist the result.
///
/// The output path is checked before the device is opened so a run that is
/// going to be refused does not consume a device transaction. The writer
/// still creates the file exclusively in case the path appears in between.
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tracing::info;
use zeroize::Zeroizing;

use crate::cli::Cli;
use crate::config::Config;
use crate::device::DeviceChannel;
use crate::error::KeyblobError;
use crate::mode::Operation;
use crate::request::{self, KeyModifier};
use crate::size::SizePlan;
use crate::{output, transaction};

/// Run the CLI flow against the channel `open_channel` builds for the configured node.
pub fn run<C, F>(cli: &Cli, open_channel: F) -> anyhow::Result<()>
where
    C: DeviceChannel,
    F: FnOnce(&Path) -> C,
{
    // ── 1. Resolve mode before touching any file ─────────────────────────
    let op: Operation = cli.operation.parse()?;

    // ── 2. Configuration and layout self-check ───────────────────────────
    let config = Config::from_cli(cli)?;
    request::verify_layout()?;

    let channel = open_channel(&config.device);
    transact(op, &cli.input, &cli.output, &config.key_modifier, &channel)
}

/// Wrap or unwrap `input` into a newly created `output`.
pub fn transact<C: DeviceChannel>(
    op: Operation,
    input: &Path,
    output: &Path,
    keymod: &KeyModifier,
    channel: &C,
) -> anyhow::Result<()> {
    output::ensure_absent(output)?;

    let data = read_input(op, input)?;
    info!("{}ing {} bytes from {}", op.verb(), data.len(), input.display());

    let result = transaction::execute(op, keymod, channel, data)
        .with_context(|| format!("{} transaction failed", op))?;

    output::write_new(output, &result)?;
    info!("{}ed {} bytes to {}", op.verb(), result.len(), output.display());

    Ok(())
}

/// Read the operation's input after checking its size on disk against the policy.
fn read_input(op: Operation, path: &Path) -> Result<Zeroizing<Vec<u8>>, KeyblobError> {
    let unreadable = |source| KeyblobError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::open(path).map_err(unreadable)?;
    let len = file.metadata().map_err(unreadable)?.len();
    let len = usize::try_from(len).unwrap_or(usize::MAX);
    let plan = SizePlan::for_input(op, len)?;

    let expected = match op {
        Operation::Wrap => plan.clear_len,
        Operation::Unwrap => plan.blob_len,
    };
    let mut data = Zeroizing::new(Vec::with_capacity(expected));
    file.read_to_end(&mut data).map_err(unreadable)?;
    Ok(data)
}
