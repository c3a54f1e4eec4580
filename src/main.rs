//! CLI entry point for the CTS expectations roller.
//!
//! The roll workflow is designed to be reviewable: fresh CI results are
//! folded into the expectations file deterministically, hand-maintained
//! chunks are never rewritten, and every change is explained by a
//! diagnostic anchored to its source line.

use anyhow::Result;
use clap::Parser;
use cts_roller::cli::{self, Command};
use cts_roller::workflow;

fn main() -> Result<()> {
    let args = cli::RootArgs::parse();

    match args.command {
        Command::Roll(args) => workflow::run_roll(args),
        Command::Fmt(args) => workflow::run_fmt(args),
        Command::Check(args) => workflow::run_check(args),
    }
}
