//! Embeds the version shown by `commu --version`.
//!
//! Order: `COMMU_RELEASE_VERSION` at build time, then `git describe`, then
//! the package version.

use std::env;
use std::process::Command;

const OVERRIDE_ENV: &str = "COMMU_RELEASE_VERSION";

fn main() {
    println!("cargo:rerun-if-env-changed={}", OVERRIDE_ENV);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let version = env::var(OVERRIDE_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(describe)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=COMMU_VERSION={}", version.trim_start_matches('v'));
}

/// `git describe`, marked `-dirty` when the tree has local changes.
fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    (!described.is_empty()).then(|| described.to_string())
}
