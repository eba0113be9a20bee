//! Transaction executor: one wrap or unwrap, from validated input to filled output buffer.
//!
//! The device lock is held only around the submission; it is released before
//! this module returns, whether the device call succeeded or not. Persisting
//! the result is left to the caller.

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::device::{DeviceChannel, KeyBlobDevice};
use crate::error::Result;
use crate::mode::Operation;
use crate::request::{KeyBlobRequest, KeyModifier};
use crate::size::SizePlan;

/// Run `op` on `input` through a device taken from `channel`.
///
/// Returns the buffer the device filled in: the blob for [`Operation::Wrap`],
/// the raw key for [`Operation::Unwrap`]. Sizes are validated before anything
/// is allocated or the channel is touched.
pub fn execute<C: DeviceChannel>(
    op: Operation,
    keymod: &KeyModifier,
    channel: &C,
    mut input: Zeroizing<Vec<u8>>,
) -> Result<Zeroizing<Vec<u8>>> {
    let plan = SizePlan::for_input(op, input.len())?;
    debug!(?plan, "sizes validated");

    let mut output = Zeroizing::new(vec![0u8; plan.output_len(op)]);

    let (clear, blob) = match op {
        Operation::Wrap => (input.as_mut_slice(), output.as_mut_slice()),
        Operation::Unwrap => (output.as_mut_slice(), input.as_mut_slice()),
    };
    let mut request = KeyBlobRequest::new(clear, blob, keymod)?;
    debug!(?request, "request assembled");

    let mut device = channel.acquire()?;
    info!("issuing ioctl {:x}", op.command_code());
    let submitted = device.submit(op, &mut request);
    drop(device);
    submitted?;

    Ok(output)
}
