//! assetpack - command-line bridge to the Asset Pack service.
//!
//! Logs in through the website's callback flow, keeps the token pair
//! per flavor, and downloads packs into a local directory tree.

mod browser;
mod cli;
mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use config::{FileConfig, Settings};
use context::Context;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file = FileConfig::load(cli.config.as_deref())?;

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs, file.debug_mode);

    let settings = Settings::resolve(&cli, file)?;
    tracing::debug!(?settings, "Resolved settings");
    let ctx = Context::new(settings);

    match cli.command {
        Commands::Login(args) => commands::login::run(&ctx, args).await,
        Commands::Logout(args) => commands::logout::run(&ctx, args),
        Commands::Whoami(args) => commands::whoami::run(&ctx, args),
        Commands::RefreshToken(args) => commands::refresh_token::run(&ctx, args).await,
        Commands::ListPacks(args) => commands::list_packs::run(&ctx, args).await,
        Commands::Download(args) => commands::download::run(&ctx, args).await,
    }
}

fn init_logging(verbosity: u8, json: bool, debug_mode: bool) {
    let filter = match verbosity {
        0 if debug_mode => "debug",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
