use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::device::CAAM_DEV;

#[derive(Parser, Debug)]
#[command(
    name = "caam-tool",
    version,
    about = "Wrap and unwrap key material with the CAAM key blob device"
)]
pub struct Cli {
    /// enc (wrap a raw key into a blob) or dec (unwrap a blob into a raw key)
    #[arg(value_name = "OPERATION")]
    pub operation: String,

    /// File to read: the raw key for enc, the key blob for dec
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// File to create; must not exist yet
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Key blob device node
    #[arg(long, env = "CAAM_KB_DEVICE", default_value = CAAM_DEV, value_name = "PATH")]
    pub device: PathBuf,

    /// Raw 16-byte key modifier file (all zero if omitted)
    #[arg(long, value_name = "PATH")]
    pub keymod: Option<PathBuf>,

    /// Increase log verbosity (-v shows the request layout)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}
