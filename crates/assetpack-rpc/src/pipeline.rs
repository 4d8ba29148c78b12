//! Pack download pipeline.
//!
//! Resolves a pack manifest through the authorized client, downloads every
//! model's resources into the [`PackLayout`] tree and hands each complete
//! model to a [`Materializer`]. Models are processed in manifest order and
//! fail independently: one bad model never stops the others.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use assetpack_core::error::{Error, PackError};
use assetpack_core::traits::Materializer;
use assetpack_core::{
    DownloadedFile, DownloadedModel, FailedModel, ModelRef, PackId, PackLayout, PipelineReport,
    ResourceKind, Result, Slug,
};

use crate::authorized::AuthorizedClient;
use crate::client::download_client;

/// Suffix of files still being downloaded.
const PART_SUFFIX: &str = "part";

/// Progress notifications of a download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    ManifestResolved {
        pack: String,
        models: usize,
    },
    ModelStarted {
        name: String,
        index: usize,
        total: usize,
    },
    ResourceDownloaded {
        model: String,
        kind: ResourceKind,
        bytes: u64,
    },
    ModelFinished {
        name: String,
        success: bool,
    },
}

enum ModelError {
    Cancelled,
    Failed(PackError),
}

impl From<PackError> for ModelError {
    fn from(err: PackError) -> Self {
        ModelError::Failed(err)
    }
}

/// Downloads packs into a local directory tree.
///
/// Starting a download cancels the run in progress, if any; the superseded
/// run stops at its next step and reports `cancelled`.
pub struct PackDownloader {
    api: AuthorizedClient,
    http: reqwest::Client,
    layout: PackLayout,
    materializer: Arc<dyn Materializer>,
    progress: Option<mpsc::UnboundedSender<DownloadEvent>>,
    runs: AtomicU64,
    active: Mutex<Option<(u64, CancellationToken)>>,
}

impl PackDownloader {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api: AuthorizedClient,
        layout: PackLayout,
        materializer: Arc<dyn Materializer>,
    ) -> Result<Self> {
        Ok(Self::with_http_client(
            api,
            layout,
            materializer,
            download_client()?,
        ))
    }

    /// Create a downloader fetching resources with `http`.
    pub fn with_http_client(
        api: AuthorizedClient,
        layout: PackLayout,
        materializer: Arc<dyn Materializer>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            api,
            http,
            layout,
            materializer,
            progress: None,
            runs: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Send progress events to `tx`.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn layout(&self) -> &PackLayout {
        &self.layout
    }

    /// Cancel the run in progress, if any.
    pub fn cancel(&self) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((_, cancel)) = active.take() {
            cancel.cancel();
        }
    }

    /// Download a pack, or the user's default pack when `pack_id` is `None`.
    ///
    /// Never fails as a whole: manifest errors, per-model failures and
    /// cancellation are all recorded in the returned report.
    #[instrument(skip_all, fields(pack = pack_id.map(PackId::as_str).unwrap_or("default")))]
    pub async fn download_pack(&self, pack_id: Option<&PackId>) -> PipelineReport {
        let (run, cancel) = self.begin_run();
        let report = self.run(pack_id, &cancel).await;
        self.end_run(run);

        info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            cancelled = report.cancelled,
            "Pack download finished"
        );
        report
    }

    async fn run(&self, pack_id: Option<&PackId>, cancel: &CancellationToken) -> PipelineReport {
        let manifest = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            manifest = self.api.pack_manifest(pack_id) => Some(manifest),
        };
        let manifest = match manifest {
            None => {
                return PipelineReport {
                    pack_id: pack_id.cloned(),
                    cancelled: true,
                    ..PipelineReport::default()
                };
            }
            Some(Err(e)) => {
                error!(error = %e, "Could not resolve pack manifest");
                let err = PackError::Manifest {
                    reason: e.to_string(),
                };
                return PipelineReport::manifest_failed(
                    pack_id.cloned(),
                    &err,
                    e.requires_login(),
                );
            }
            Some(Ok(manifest)) => manifest,
        };

        let total = manifest.models.len();
        info!(pack = manifest.label(), models = total, "Resolved pack manifest");
        self.emit(DownloadEvent::ManifestResolved {
            pack: manifest.label().to_string(),
            models: total,
        });
        warn_on_slug_collisions(&manifest.models);

        let pack_slug = manifest.slug();
        let mut report = PipelineReport {
            pack_id: manifest.pack_id.clone(),
            pack_name: manifest.name.clone(),
            ..PipelineReport::default()
        };

        for (index, model) in manifest.models.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            self.emit(DownloadEvent::ModelStarted {
                name: model.name.clone(),
                index,
                total,
            });

            let outcome = match self.download_model(&pack_slug, model, cancel).await {
                Ok(downloaded) => match self.materializer.materialize(&downloaded).await {
                    Ok(()) => Ok(downloaded),
                    Err(e) => Err(ModelError::Failed(materialization_error(&model.name, e))),
                },
                Err(e) => Err(e),
            };

            let success = match outcome {
                Ok(downloaded) => {
                    debug!(model = %model.name, dir = %downloaded.directory.display(), "Model ready");
                    report.succeeded.push(downloaded);
                    true
                }
                Err(ModelError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(ModelError::Failed(err)) => {
                    warn!(model = %model.name, error = %err, "Model failed");
                    report.failed.push(FailedModel::new(&model.name, &err));
                    false
                }
            };

            self.emit(DownloadEvent::ModelFinished {
                name: model.name.clone(),
                success,
            });
        }

        report
    }

    /// Download every resource of one model.
    ///
    /// Resources are staged as `.part` files and moved into place only when
    /// all of them arrived, so a failed model leaves no partial file set.
    async fn download_model(
        &self,
        pack: &Slug,
        model: &ModelRef,
        cancel: &CancellationToken,
    ) -> std::result::Result<DownloadedModel, ModelError> {
        if model.resources.is_empty() {
            return Err(PackError::NoResources {
                model: model.name.clone(),
            }
            .into());
        }

        let directory = self.layout.model_dir(pack, model);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| PackError::ResourceDownload {
                url: model.resources[0].url.clone(),
                reason: format!("cannot create {}: {}", directory.display(), e),
            })?;

        let mut staged: Vec<(DownloadedFile, PathBuf)> = Vec::new();
        for resource in &model.resources {
            let target = self.layout.resource_path(pack, model, resource.kind);
            let part = part_path(&target);

            let fetched = if cancel.is_cancelled() {
                Err(ModelError::Cancelled)
            } else {
                self.fetch(&resource.url, &part, cancel).await
            };

            match fetched {
                Ok(bytes) => {
                    debug!(model = %model.name, kind = %resource.kind, bytes, "Resource downloaded");
                    self.emit(DownloadEvent::ResourceDownloaded {
                        model: model.name.clone(),
                        kind: resource.kind,
                        bytes,
                    });
                    staged.push((
                        DownloadedFile {
                            kind: resource.kind,
                            path: target,
                            bytes,
                        },
                        part,
                    ));
                }
                Err(e) => {
                    remove_quietly(&part).await;
                    discard(&directory, &staged).await;
                    return Err(e);
                }
            }
        }

        for (index, (file, _)) in staged.iter().enumerate() {
            if let Ok(meta) = tokio::fs::symlink_metadata(&file.path).await
                && meta.is_dir()
            {
                discard(&directory, &staged).await;
                return Err(PackError::ResourceDownload {
                    url: model.resources[index].url.clone(),
                    reason: format!("{} is a directory", file.path.display()),
                }
                .into());
            }
        }

        let mut files: Vec<DownloadedFile> = Vec::with_capacity(staged.len());
        for (index, (file, part)) in staged.iter().enumerate() {
            if let Err(e) = tokio::fs::rename(part, &file.path).await {
                for moved in &files {
                    remove_quietly(&moved.path).await;
                }
                discard(&directory, &staged[index..]).await;
                return Err(PackError::ResourceDownload {
                    url: model.resources[index].url.clone(),
                    reason: format!("cannot move {} into place: {}", part.display(), e),
                }
                .into());
            }
            files.push(file.clone());
        }

        Ok(DownloadedModel {
            name: model.name.clone(),
            slug: model.slug(),
            directory,
            files,
        })
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<u64, ModelError> {
        let failed = |reason: String| {
            ModelError::Failed(PackError::ResourceDownload {
                url: url.to_string(),
                reason,
            })
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ModelError::Cancelled),
            response = self.http.get(url).send() => response.map_err(|e| failed(e.to_string()))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status)));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| failed(format!("cannot create {}: {}", dest.display(), e)))?;

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ModelError::Cancelled),
                chunk = stream.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    file.write_all(&bytes)
                        .await
                        .map_err(|e| failed(e.to_string()))?;
                    written += bytes.len() as u64;
                }
                Some(Err(e)) => return Err(failed(e.to_string())),
                None => break,
            }
        }
        file.flush().await.map_err(|e| failed(e.to_string()))?;

        Ok(written)
    }

    fn begin_run(&self) -> (u64, CancellationToken) {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((previous, token)) = active.replace((run, cancel.clone())) {
            debug!(previous, run, "Superseding running download");
            token.cancel();
        }
        (run, cancel)
    }

    fn end_run(&self, run: u64) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if active.as_ref().is_some_and(|(current, _)| *current == run) {
            *active = None;
        }
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }
}

fn materialization_error(model: &str, err: Error) -> PackError {
    match err {
        Error::Pack(err @ PackError::Materialization { .. }) => err,
        other => PackError::Materialization {
            model: model.to_string(),
            reason: other.to_string(),
        },
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PART_SUFFIX);
    target.with_file_name(name)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Could not remove partial file");
    }
}

/// Drop staged files of a failed model and its directory if that leaves it
/// empty.
async fn discard(directory: &Path, staged: &[(DownloadedFile, PathBuf)]) {
    for (_, part) in staged {
        remove_quietly(part).await;
    }
    // Fails harmlessly when files from an earlier run are still there.
    let _ = tokio::fs::remove_dir(directory).await;
}

fn warn_on_slug_collisions(models: &[ModelRef]) {
    let mut seen: HashMap<Slug, &str> = HashMap::new();
    for model in models {
        if let Some(first) = seen.insert(model.slug(), &model.name) {
            warn!(
                first,
                second = %model.name,
                "Models share a directory; the later one overwrites the earlier"
            );
        }
    }
}
