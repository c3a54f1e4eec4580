//! Shared test infrastructure for integration tests.

use std::path::Path;
use std::process::{Command, Output};

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directory");
    }
    std::fs::write(path, contents).expect("write file");
}

pub fn run_ctsr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ctsr"))
        .args(args)
        .output()
        .expect("run ctsr")
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
