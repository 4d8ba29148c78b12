//! Refresh token command implementation.

use anyhow::Result;
use clap::Args;

use crate::context::Context;
use crate::output;

use super::describe;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(ctx: &Context, _args: RefreshTokenArgs) -> Result<()> {
    output::note("Refreshing access token...");

    let credential = ctx
        .authorized()?
        .refresh()
        .await
        .map_err(|e| describe(e, "Failed to refresh access token"))?;

    output::success("Access token refreshed");
    output::field("Access expiry", &credential.access_expiry().to_rfc3339());

    Ok(())
}
