//! Binary for the ATPG/PODEM engine.

#![warn(missing_docs)]

use clap::Parser;
use podem_atpg::cmd::{Cli, Commands};

#[doc(hidden)]
fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Atpg(a) => a.run(),
        Commands::Simulate(a) => a.run(),
    }
}
