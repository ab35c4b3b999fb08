//! Build script for the govm binary.
//!
//! Embeds the short git commit so `govm version --verbose` can report it.

use std::process::Command;

fn main() {
    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GOVM_GIT_COMMIT={commit}");

    if let Some(toplevel) = git(&["rev-parse", "--show-toplevel"]) {
        println!("cargo:rerun-if-changed={toplevel}/.git/HEAD");
    }
}

/// Runs git with `args` and returns trimmed stdout when it succeeds with output.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
