//! Download command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use tokio::sync::mpsc;

use assetpack_core::{PackId, PipelineReport};
use assetpack_rpc::DownloadEvent;

use crate::context::Context;
use crate::output;

use super::{LOGIN_HINT, describe};

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Pack to download; the account's default pack when omitted
    pub pack_id: Option<String>,

    /// Target directory (defaults to the configured download directory)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(ctx: &Context, args: DownloadArgs) -> Result<()> {
    let pack_id = args
        .pack_id
        .as_deref()
        .map(PackId::new)
        .transpose()
        .context("Invalid pack id")?;

    let api = ctx.authorized()?;
    if !api
        .is_logged_in()
        .map_err(|e| describe(e, "Failed to load stored credential"))?
    {
        bail!(LOGIN_HINT);
    }

    let out = args
        .out
        .unwrap_or_else(|| ctx.settings.download_dir.clone());

    let (tx, rx) = mpsc::unbounded_channel();
    let downloader = Arc::new(ctx.downloader(&out)?.with_progress(tx));
    let printer = tokio::spawn(print_progress(rx, !args.json));
    let interrupt = {
        let downloader = Arc::clone(&downloader);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                output::note("Cancelling download...");
                downloader.cancel();
            }
        })
    };

    let report = downloader.download_pack(pack_id.as_ref()).await;

    interrupt.abort();
    let _ = interrupt.await;
    drop(downloader);
    let _ = printer.await;

    if args.json {
        output::json_pretty(&report)?;
    } else {
        print_report(&report, &out);
    }

    if let Some(failure) = &report.manifest_failure {
        if failure.requires_login {
            bail!("{} ({})", LOGIN_HINT, failure.reason);
        }
        bail!("Download failed: {}", failure.reason);
    }
    if report.cancelled {
        bail!("Download cancelled");
    }
    if !report.is_success() {
        bail!(
            "{} of {} models failed",
            report.failed_count(),
            report.failed_count() + report.succeeded_count()
        );
    }

    Ok(())
}

async fn print_progress(mut rx: mpsc::UnboundedReceiver<DownloadEvent>, enabled: bool) {
    while let Some(event) = rx.recv().await {
        if !enabled {
            continue;
        }
        match event {
            DownloadEvent::ManifestResolved { pack, models } => {
                output::note(&format!("Downloading {} ({} models)", pack, models));
            }
            DownloadEvent::ModelStarted { name, index, total } => {
                output::step(index, total, &name);
            }
            DownloadEvent::ResourceDownloaded { kind, bytes, .. } => {
                output::note(&format!("  {} {}", kind, output::size(bytes)));
            }
            DownloadEvent::ModelFinished {
                name,
                success: false,
            } => {
                output::error(&format!("{name} failed"));
            }
            DownloadEvent::ModelFinished { .. } => {}
        }
    }
}

fn print_report(report: &PipelineReport, out: &Path) {
    if report.manifest_failure.is_some() {
        return;
    }

    println!();
    for model in &report.succeeded {
        output::success(&format!("{} -> {}", model.name, model.directory.display()));
    }
    for failed in &report.failed {
        output::error(&format!("{}: {}", failed.model, failed.reason));
    }
    println!();
    let pack = report
        .pack_name
        .as_deref()
        .or(report.pack_id.as_ref().map(PackId::as_str))
        .unwrap_or("default");
    output::field("Pack", pack);
    output::field("Directory", &out.display().to_string());
    output::field("Downloaded", &report.succeeded_count().to_string());
    output::field("Failed", &report.failed_count().to_string());
}
