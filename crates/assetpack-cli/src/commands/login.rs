//! Login command implementation.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;

use assetpack_core::traits::{Browser, NoBrowser};
use assetpack_rpc::FlowState;

use crate::browser::SystemBrowser;
use crate::context::Context;
use crate::output;

use super::describe;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Print the login URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,
}

pub async fn run(ctx: &Context, args: LoginArgs) -> Result<()> {
    let browser: Arc<dyn Browser> = if args.no_browser {
        Arc::new(NoBrowser)
    } else {
        Arc::new(SystemBrowser)
    };
    let flow = ctx.callback_flow(browser)?;

    output::note("Starting login...");
    let mut handle = flow.start();

    loop {
        tokio::select! {
            state = handle.next_state() => match state {
                Some(FlowState::AwaitingCallback { login_url, polls: 0, .. }) => {
                    eprintln!("Complete the login in your browser:");
                    output::link(&login_url);
                    output::note("Waiting for the website to confirm...");
                }
                Some(state) if state.is_terminal() => break,
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                flow.stop();
                break;
            }
        }
    }

    match handle.wait().await {
        Some(Ok(())) => {
            output::success("Logged in successfully");
            output::field("Flavor", ctx.settings.flavor.as_str());
            Ok(())
        }
        Some(Err(e)) => Err(describe(e, "Login failed")),
        None => bail!("Login cancelled"),
    }
}
