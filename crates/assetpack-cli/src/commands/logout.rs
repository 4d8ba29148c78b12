//! Logout command implementation.

use anyhow::{Context as _, Result};
use clap::Args;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn run(ctx: &Context, _args: LogoutArgs) -> Result<()> {
    ctx.store()
        .clear(&ctx.settings.flavor)
        .context("Failed to clear stored credential")?;

    output::success("Logged out");
    Ok(())
}
