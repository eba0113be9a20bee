use std::path::Path;

use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};

use caam_keyblob::cli::Cli;
use caam_keyblob::commands;
use caam_keyblob::device::CaamChannel;
use caam_keyblob::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(logging::level_for(cli.verbose, cli.quiet));

    if let Err(e) = commands::run::run(&cli, |path: &Path| CaamChannel::new(path)) {
        eprintln!(
            "{}",
            format!("caam_tool: error, {:#}", e).if_supports_color(Stderr, |t| t.red())
        );
        std::process::exit(1);
    }
}
