use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the expectations roller.
#[derive(Parser, Debug)]
#[command(
    name = "ctsr",
    version,
    about = "Rolls a CTS expectations file forward from fresh CI results",
    after_help = "Commands:\n  roll --expectations <FILE> --results <FILE> --test-list <FILE>\n                                       Update expectations from a results capture\n  fmt --expectations <FILE>            Re-canonicalize an expectations file\n  check --expectations <FILE>          Parse and validate an expectations file\n\nExamples:\n  ctsr roll --expectations webgpu.txt --results results.json --test-list tests.txt\n  ctsr roll --expectations webgpu.txt --results results.json --test-list tests.txt \\\n      --remove-tag slow-bot --out rolled.txt --verbose\n  ctsr fmt --expectations webgpu.txt\n  ctsr check --expectations webgpu.txt",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Roll(RollArgs),
    Fmt(FmtArgs),
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Update an expectations file from a results capture")]
pub struct RollArgs {
    /// Expectations file to update
    #[arg(long, value_name = "FILE")]
    pub expectations: PathBuf,

    /// JSON list of results captured from CI
    #[arg(long, value_name = "FILE")]
    pub results: PathBuf,

    /// Newline-delimited listing of known test queries
    #[arg(long, value_name = "FILE")]
    pub test_list: PathBuf,

    /// Tag to scrub from every result before processing (repeatable)
    #[arg(long, value_name = "TAG")]
    pub remove_tag: Vec<String>,

    /// Write the updated document here instead of in place
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Emit a verbose transcript of the roll
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Re-canonicalize an expectations file")]
pub struct FmtArgs {
    /// Expectations file to format
    #[arg(long, value_name = "FILE")]
    pub expectations: PathBuf,

    /// Write the formatted document here instead of in place
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Parse and validate an expectations file")]
pub struct CheckArgs {
    /// Expectations file to check
    #[arg(long, value_name = "FILE")]
    pub expectations: PathBuf,
}
