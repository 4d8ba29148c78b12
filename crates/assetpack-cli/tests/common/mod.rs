#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use chrono::{Duration, Utc};

use assetpack_core::traits::CredentialStore;
use assetpack_core::{AccessToken, Credential, Flavor, RefreshToken};
use assetpack_file::FileCredentialStore;

/// Run the CLI binary with an isolated data directory and no user config.
pub fn run_cli(args: &[&str], home: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_assetpack"));
    cmd.arg("--data-dir").arg(home.join("data"));
    cmd.args(args);
    for var in [
        "ASSETPACK_API_URL",
        "ASSETPACK_WEBSITE_URL",
        "ASSETPACK_FLAVOR",
        "ASSETPACK_DATA_DIR",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("ASSETPACK_CONFIG", home.join("config.json"));
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub fn run_cli_success(args: &[&str], home: &Path) -> String {
    let output = run_cli(args, home);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub fn run_cli_failure(args: &[&str], home: &Path) -> String {
    let output = run_cli(args, home);
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Write a config file picked up by `run_cli`.
pub fn write_config(home: &Path, config: serde_json::Value) {
    std::fs::write(home.join("config.json"), config.to_string()).unwrap();
}

/// Store a credential for the default flavor, valid for `valid_for`.
pub fn store_credential(home: &Path, access: &str, refresh: &str, valid_for: Duration) {
    let store = FileCredentialStore::new(home.join("data"));
    let credential = Credential::new(
        AccessToken::new(access),
        RefreshToken::new(refresh),
        Utc::now() + valid_for,
    )
    .unwrap();
    store.save(&Flavor::prod(), &credential).unwrap();
}

/// Load the stored credential of the default flavor.
pub fn stored_credential(home: &Path) -> Option<Credential> {
    FileCredentialStore::new(home.join("data"))
        .load(&Flavor::prod())
        .unwrap()
}
