//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{
    download::DownloadArgs, list_packs::ListPacksArgs, login::LoginArgs, logout::LogoutArgs,
    refresh_token::RefreshTokenArgs, whoami::WhoamiArgs,
};

/// Asset Pack bridge: log in and download model packs.
#[derive(Parser, Debug)]
#[command(name = "assetpack")]
#[command(author, version = env!("ASSETPACK_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (JSON)
    #[arg(long, env = "ASSETPACK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Deployment flavor; credentials are kept per flavor
    #[arg(long, env = "ASSETPACK_FLAVOR", global = true)]
    pub flavor: Option<String>,

    /// API base URL
    #[arg(long, env = "ASSETPACK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Website base URL used for browser login
    #[arg(long, env = "ASSETPACK_WEBSITE_URL", global = true)]
    pub website_url: Option<String>,

    /// Directory holding credentials and downloaded packs
    #[arg(long, env = "ASSETPACK_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in through the website
    Login(LoginArgs),

    /// Forget the stored credential
    Logout(LogoutArgs),

    /// Display the login state
    Whoami(WhoamiArgs),

    /// Refresh the access token now
    RefreshToken(RefreshTokenArgs),

    /// List packs available to the account
    ListPacks(ListPacksArgs),

    /// Download a pack
    Download(DownloadArgs),
}
