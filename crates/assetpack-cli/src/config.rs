//! Configuration file and resolved settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;

use assetpack_core::{ExpiryPolicy, Flavor, ServiceUrl};
use assetpack_rpc::PollConfig;

use crate::cli::Cli;

pub const DEFAULT_WEBSITE_URL: &str = "https://assetpack.ai";
pub const DEFAULT_API_URL: &str = "https://api.assetpack.ai";
const CONFIG_FILE: &str = "config.json";
const PACKS_DIR: &str = "packs";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("ai", "assetpack", "assetpack")
        .context("Could not determine the user's config directory")
}

/// How access token expiry is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenExpiry {
    Fixed,
    TokenClaim,
}

/// Contents of `config.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub website_url: Option<String>,
    pub api_url: Option<String>,
    pub debug_mode: bool,
    pub flavor: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub poll_interval_secs: Option<f64>,
    /// `0` polls without a deadline.
    pub poll_timeout_secs: Option<f64>,
    pub token_expiry: Option<TokenExpiry>,
}

impl FileConfig {
    /// Load the configuration from `path`, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => project_dirs()?.config_dir().join(CONFIG_FILE),
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        serde_json::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Settings after applying flags, environment, config file and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub website: ServiceUrl,
    pub api: ServiceUrl,
    pub flavor: Flavor,
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
    pub poll: PollConfig,
    pub expiry: ExpiryPolicy,
    pub debug_mode: bool,
}

impl Settings {
    /// Resolve settings. Flags and environment variables (already merged by
    /// clap) win over the file, which wins over the defaults.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self> {
        let website = cli
            .website_url
            .as_deref()
            .or(file.website_url.as_deref())
            .unwrap_or(DEFAULT_WEBSITE_URL);
        let website = ServiceUrl::new(website).context("Invalid website URL")?;

        let api = cli
            .api_url
            .as_deref()
            .or(file.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL);
        let api = ServiceUrl::new(api).context("Invalid API URL")?;

        let flavor = match cli.flavor.as_deref().or(file.flavor.as_deref()) {
            Some(flavor) => Flavor::new(flavor).context("Invalid flavor")?,
            None => Flavor::prod(),
        };

        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => project_dirs()?.data_dir().to_path_buf(),
        };
        let download_dir = file
            .download_dir
            .clone()
            .unwrap_or_else(|| data_dir.join(PACKS_DIR));

        let defaults = PollConfig::default();
        let interval = match file.poll_interval_secs {
            Some(secs) => seconds(secs, "pollIntervalSecs")?,
            None => defaults.interval,
        };
        let timeout = match file.poll_timeout_secs {
            Some(secs) if secs == 0.0 => None,
            Some(secs) => Some(seconds(secs, "pollTimeoutSecs")?),
            None => defaults.timeout,
        };

        let expiry = match file.token_expiry.unwrap_or(TokenExpiry::Fixed) {
            TokenExpiry::Fixed => ExpiryPolicy::default(),
            TokenExpiry::TokenClaim => ExpiryPolicy::token_claim(),
        };

        Ok(Self {
            website,
            api,
            flavor,
            data_dir,
            download_dir,
            poll: PollConfig { interval, timeout },
            expiry,
            debug_mode: file.debug_mode,
        })
    }
}

fn seconds(value: f64, key: &str) -> Result<Duration> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{key} must be a positive number of seconds, got {value}");
    }
    Ok(Duration::from_secs_f64(value))
}
