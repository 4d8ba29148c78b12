//! Stamps the binary's `--version` with the commit it was built from.
//!
//! Packagers can pin the string with `ASSETPACK_BUILD_VERSION`; otherwise
//! the crate version is suffixed with the short commit hash when building
//! from a git checkout.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=ASSETPACK_BUILD_VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let pkg = env!("CARGO_PKG_VERSION");
    let version = match env::var("ASSETPACK_BUILD_VERSION") {
        Ok(pinned) if !pinned.trim().is_empty() => pinned.trim().to_string(),
        _ => match commit() {
            Some(hash) => format!("{pkg} ({hash})"),
            None => pkg.to_string(),
        },
    };

    println!("cargo:rustc-env=ASSETPACK_VERSION={version}");
}

fn commit() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=9", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())?;
    let hash = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (!hash.is_empty()).then_some(hash)
}
