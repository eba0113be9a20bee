//! Software stand-in for the CAAM key blob device.
#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use caam_keyblob::device::{DeviceChannel, KeyBlobDevice};
use caam_keyblob::error::{KeyblobError, Result};
use caam_keyblob::mode::Operation;
use caam_keyblob::request::KeyBlobRequest;

pub const HEADER: [u8; 32] = [0xC4; 32];
pub const TAG: [u8; 16] = [0x7A; 16];

/// Channel that counts acquisitions and hands out [`FramingDevice`]s.
#[derive(Default, Clone)]
pub struct RecordingChannel {
    pub acquired: Rc<Cell<usize>>,
    pub submitted: Rc<Cell<usize>>,
    pub released: Rc<Cell<usize>>,
}

impl RecordingChannel {
    pub fn acquired(&self) -> usize {
        self.acquired.get()
    }

    pub fn submitted(&self) -> usize {
        self.submitted.get()
    }

    pub fn released(&self) -> usize {
        self.released.get()
    }
}

impl DeviceChannel for RecordingChannel {
    type Device = FramingDevice;

    fn acquire(&self) -> Result<FramingDevice> {
        self.acquired.set(self.acquired.get() + 1);
        Ok(FramingDevice {
            channel: self.clone(),
        })
    }
}

/// Wraps by framing the raw key between [`HEADER`] and [`TAG`]; unwrap checks
/// and strips the frame, failing with EBADMSG on anything else.
pub struct FramingDevice {
    channel: RecordingChannel,
}

impl KeyBlobDevice for FramingDevice {
    fn submit(&mut self, op: Operation, request: &mut KeyBlobRequest<'_>) -> Result<()> {
        self.channel
            .submitted
            .set(self.channel.submitted.get() + 1);

        let bufs = request.buffers_mut();
        let body_end = bufs.blob.len() - TAG.len();
        match op {
            Operation::Wrap => {
                bufs.blob[..HEADER.len()].copy_from_slice(&HEADER);
                bufs.blob[HEADER.len()..body_end].copy_from_slice(bufs.clear);
                bufs.blob[body_end..].copy_from_slice(&TAG);
            }
            Operation::Unwrap => {
                if bufs.blob[..HEADER.len()] != HEADER || bufs.blob[body_end..] != TAG {
                    return Err(KeyblobError::DeviceIoError {
                        errno: nix::errno::Errno::EBADMSG,
                    });
                }
                bufs.clear.copy_from_slice(&bufs.blob[HEADER.len()..body_end]);
            }
        }
        Ok(())
    }
}

impl Drop for FramingDevice {
    fn drop(&mut self) {
        self.channel.released.set(self.channel.released.get() + 1);
    }
}
