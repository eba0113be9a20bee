/// caam-keyblob library crate: the device transaction protocol for the CAAM
/// key blob driver, plus the glue the `caam-tool` binary is built from.
///
/// Components, leaf first: `size` (admission control), `request` (wire
/// structure), `device` (locked access to the node), `transaction`
/// (one wrap/unwrap), `output` (exclusive, synced result files).
pub mod cli;
pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod mode;
pub mod output;
pub mod request;
pub mod size;
pub mod transaction;

pub use device::{CaamChannel, DeviceChannel, KeyBlobDevice};
pub use error::{ErrorClass, KeyblobError};
pub use mode::Operation;
pub use request::{KeyBlobRequest, KeyModifier};
