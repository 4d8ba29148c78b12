//! Whoami command implementation.

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use crate::context::Context;
use crate::output;

use super::LOGIN_HINT;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub fn run(ctx: &Context, _args: WhoamiArgs) -> Result<()> {
    let credential = ctx
        .store()
        .load(&ctx.settings.flavor)
        .context("Failed to load stored credential")?
        .context(LOGIN_HINT)?;

    let expiry = credential.access_expiry();
    let expiry = if credential.is_expired_at(Utc::now()) {
        format!("{} {}", expiry.to_rfc3339(), "(expired, refreshed on next call)".yellow())
    } else {
        expiry.to_rfc3339()
    };

    output::field("Status", "logged in");
    output::field("Flavor", ctx.settings.flavor.as_str());
    output::field("API", &ctx.settings.api.to_string());
    output::field("Access expiry", &expiry);
    output::field("Credential file", &ctx.credential_path().display().to_string());

    Ok(())
}
