//! Request model: the `caam_kb_data` structure exchanged with the CAAM key blob driver.
//!
//! The kernel declares the structure as three `(char *, size_t)` pairs:
//!
//! ```c
//! struct caam_kb_data {
//!     char *rawkey;
//!     size_t rawkey_len;
//!     char *keyblob;
//!     size_t keyblob_len;
//!     char *keymod;
//!     size_t keymod_len;
//! };
//! ```
//!
//! The length fields are pinned to a fixed-width integer per target pointer
//! width ([`KbLen`]) rather than `usize`, and the layout is asserted at compile
//! time. The ioctl request codes are derived from the asserted size, so a
//! layout drift can never silently reach the driver.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{offset_of, size_of};

use nix::sys::ioctl::ioctl_num_type;
use zeroize::Zeroizing;

use crate::error::{KeyblobError, Result};
use crate::size::{self, KEYMOD_LEN};

/// Width of a kernel `size_t` on 32-bit targets.
#[cfg(target_pointer_width = "32")]
pub type KbLen = u32;

/// Width of a kernel `size_t` on 64-bit targets.
#[cfg(target_pointer_width = "64")]
pub type KbLen = u64;

/// ioctl magic for the key blob driver (`CAAM_KB_MAGIC`).
pub const CAAM_KB_MAGIC: u8 = b'I';
pub const CAAM_KB_ENCRYPT_NR: u8 = 0;
pub const CAAM_KB_DECRYPT_NR: u8 = 1;

/// Binary image of `struct caam_kb_data`.
#[repr(C)]
pub struct CaamKbData {
    pub rawkey: *mut u8,
    pub rawkey_len: KbLen,
    pub keyblob: *mut u8,
    pub keyblob_len: KbLen,
    pub keymod: *mut u8,
    pub keymod_len: KbLen,
}

const WORD: usize = size_of::<usize>();

/// Field offsets of `struct caam_kb_data` in declaration order.
pub const EXPECTED_OFFSETS: [usize; 6] = [0, WORD, 2 * WORD, 3 * WORD, 4 * WORD, 5 * WORD];

/// Size of `struct caam_kb_data`: six machine words, no padding.
pub const EXPECTED_SIZE: usize = 6 * WORD;

const _: () = {
    assert!(size_of::<KbLen>() == WORD);
    assert!(size_of::<CaamKbData>() == EXPECTED_SIZE);
    assert!(offset_of!(CaamKbData, rawkey) == EXPECTED_OFFSETS[0]);
    assert!(offset_of!(CaamKbData, rawkey_len) == EXPECTED_OFFSETS[1]);
    assert!(offset_of!(CaamKbData, keyblob) == EXPECTED_OFFSETS[2]);
    assert!(offset_of!(CaamKbData, keyblob_len) == EXPECTED_OFFSETS[3]);
    assert!(offset_of!(CaamKbData, keymod) == EXPECTED_OFFSETS[4]);
    assert!(offset_of!(CaamKbData, keymod_len) == EXPECTED_OFFSETS[5]);
};

/// `_IOWR(CAAM_KB_MAGIC, 0, struct caam_kb_data)`
pub const CAAM_KB_ENCRYPT: u32 =
    nix::request_code_readwrite!(CAAM_KB_MAGIC, CAAM_KB_ENCRYPT_NR, size_of::<CaamKbData>())
        as u32;

/// `_IOWR(CAAM_KB_MAGIC, 1, struct caam_kb_data)`
pub const CAAM_KB_DECRYPT: u32 =
    nix::request_code_readwrite!(CAAM_KB_MAGIC, CAAM_KB_DECRYPT_NR, size_of::<CaamKbData>())
        as u32;

// i.MX6 reference values (size field 0x18).
#[cfg(all(target_os = "linux", target_arch = "arm"))]
const _: () = {
    assert!(CAAM_KB_ENCRYPT == 0xc018_4900);
    assert!(CAAM_KB_DECRYPT == 0xc018_4901);
};

/// Size encoded in an ioctl request code.
pub fn encoded_size(code: u32) -> usize {
    let code = code as ioctl_num_type;
    ((code >> nix::sys::ioctl::SIZESHIFT) & nix::sys::ioctl::SIZEMASK) as usize
}

/// Re-check the request layout against the running binary.
///
/// The compile-time assertions already cover this; the runtime check guards
/// against a toolchain or target mismatch slipping past a cross build.
pub fn verify_layout() -> Result<()> {
    let size = size_of::<CaamKbData>();
    if size != EXPECTED_SIZE {
        return Err(KeyblobError::LayoutMismatch(format!(
            "caam_kb_data is {} bytes, expected {}",
            size, EXPECTED_SIZE
        )));
    }
    let offsets = [
        offset_of!(CaamKbData, rawkey),
        offset_of!(CaamKbData, rawkey_len),
        offset_of!(CaamKbData, keyblob),
        offset_of!(CaamKbData, keyblob_len),
        offset_of!(CaamKbData, keymod),
        offset_of!(CaamKbData, keymod_len),
    ];
    if offsets != EXPECTED_OFFSETS {
        return Err(KeyblobError::LayoutMismatch(format!(
            "caam_kb_data offsets {:?}, expected {:?}",
            offsets, EXPECTED_OFFSETS
        )));
    }
    for code in [CAAM_KB_ENCRYPT, CAAM_KB_DECRYPT] {
        if encoded_size(code) != size {
            return Err(KeyblobError::LayoutMismatch(format!(
                "request code {:08x} encodes size {}, structure is {}",
                code,
                encoded_size(code),
                size
            )));
        }
    }
    Ok(())
}

/// Context bytes the hardware concatenates with its master key.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyModifier(Zeroizing<[u8; KEYMOD_LEN]>);

impl KeyModifier {
    /// All-zero modifier.
    pub fn zero() -> Self {
        Self(Zeroizing::new([0u8; KEYMOD_LEN]))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEYMOD_LEN] =
            bytes
                .try_into()
                .map_err(|_| KeyblobError::InvalidKeyModifier {
                    len: bytes.len(),
                    expected: KEYMOD_LEN,
                })?;
        Ok(Self(Zeroizing::new(array)))
    }

    pub fn as_bytes(&self) -> &[u8; KEYMOD_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for KeyModifier {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for KeyModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            f.write_str("KeyModifier(zero)")
        } else {
            f.write_str("KeyModifier(..)")
        }
    }
}

/// One wrap/unwrap request, borrowing the buffers it points at.
///
/// The raw pointers inside are only valid while the borrows held by `'a`
/// are; the device call must complete within that lifetime.
pub struct KeyBlobRequest<'a> {
    raw: CaamKbData,
    _buffers: PhantomData<(&'a mut [u8], &'a mut [u8], &'a KeyModifier)>,
}

impl<'a> KeyBlobRequest<'a> {
    /// Assemble a request over caller-owned buffers.
    ///
    /// `blob` must be exactly `clear.len() + BLOB_OVERHEAD` bytes and within
    /// the protocol maximum. The buffer the device fills in is written in place.
    pub fn new(clear: &'a mut [u8], blob: &'a mut [u8], keymod: &'a KeyModifier) -> Result<Self> {
        let blob_len = size::for_wrap(clear.len())?;
        if blob.len() != blob_len {
            return Err(KeyblobError::LayoutMismatch(format!(
                "blob buffer is {} bytes, expected {}",
                blob.len(),
                blob_len
            )));
        }

        // Lengths are bounded by MAX_KEYBLOB_LEN above, so they fit any KbLen.
        let raw = CaamKbData {
            rawkey: clear.as_mut_ptr(),
            rawkey_len: clear.len() as KbLen,
            keyblob: blob.as_mut_ptr(),
            keyblob_len: blob.len() as KbLen,
            keymod: keymod.as_bytes().as_ptr().cast_mut(),
            keymod_len: KEYMOD_LEN as KbLen,
        };

        Ok(Self {
            raw,
            _buffers: PhantomData,
        })
    }

    pub fn clear_len(&self) -> usize {
        self.raw.rawkey_len as usize
    }

    pub fn blob_len(&self) -> usize {
        self.raw.keyblob_len as usize
    }

    pub fn keymod_len(&self) -> usize {
        self.raw.keymod_len as usize
    }

    /// Pointer handed to the ioctl.
    pub fn as_raw_mut(&mut self) -> *mut CaamKbData {
        &mut self.raw
    }

    /// Read-only view of the wire structure.
    pub fn raw(&self) -> &CaamKbData {
        &self.raw
    }

    /// Borrow the referenced buffers back as slices, for devices implemented
    /// in software.
    pub fn buffers_mut(&mut self) -> RequestBuffers<'_> {
        // SAFETY: every pointer was taken from a borrow held for 'a, which
        // outlives `&mut self`, and the lengths are the lengths of those
        // borrows. Empty slices still carry a dangling, non-null pointer.
        unsafe {
            RequestBuffers {
                clear: std::slice::from_raw_parts_mut(self.raw.rawkey, self.clear_len()),
                blob: std::slice::from_raw_parts_mut(self.raw.keyblob, self.blob_len()),
                keymod: std::slice::from_raw_parts(self.raw.keymod, self.keymod_len()),
            }
        }
    }
}

/// Slices behind a [`KeyBlobRequest`].
pub struct RequestBuffers<'r> {
    pub clear: &'r mut [u8],
    pub blob: &'r mut [u8],
    pub keymod: &'r [u8],
}

impl fmt::Debug for KeyBlobRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("caam_kb_data")
            .field("rawkey", &self.raw.rawkey)
            .field("rawkey_len", &self.raw.rawkey_len)
            .field("keyblob", &self.raw.keyblob)
            .field("keyblob_len", &self.raw.keyblob_len)
            .field("keymod", &self.raw.keymod)
            .field("keymod_len", &self.raw.keymod_len)
            .finish()
    }
}
