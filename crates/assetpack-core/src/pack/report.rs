//! Download outcomes and the aggregated pipeline report.

use std::path::PathBuf;

use serde::Serialize;

use super::manifest::ResourceKind;
use crate::error::PackError;
use crate::types::{PackId, Slug};

/// One file written for a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedFile {
    pub kind: ResourceKind,
    pub path: PathBuf,
    pub bytes: u64,
}

/// A model whose resources were all downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedModel {
    pub name: String,
    pub slug: Slug,
    pub directory: PathBuf,
    pub files: Vec<DownloadedFile>,
}

impl DownloadedModel {
    /// Path of the file of the given kind, if one was downloaded.
    pub fn file(&self, kind: ResourceKind) -> Option<&DownloadedFile> {
        self.files.iter().find(|f| f.kind == kind)
    }
}

/// Stage at which a model failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ResourceDownload,
    Materialization,
    NoResources,
}

/// A model that did not make it through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedModel {
    pub model: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl FailedModel {
    /// Record a per-model pack error.
    ///
    /// Manifest errors are pipeline-level and are mapped onto
    /// `ResourceDownload` only if they ever reach this point.
    pub fn new(model: impl Into<String>, error: &PackError) -> Self {
        let kind = match error {
            PackError::Materialization { .. } => FailureKind::Materialization,
            PackError::NoResources { .. } => FailureKind::NoResources,
            PackError::ResourceDownload { .. } | PackError::Manifest { .. } => {
                FailureKind::ResourceDownload
            }
        };
        Self {
            model: model.into(),
            kind,
            reason: error.to_string(),
        }
    }
}

/// Why a run stopped before downloading anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestFailure {
    pub reason: String,
    /// The stored credential is missing or was rejected.
    pub requires_login: bool,
}

/// Aggregated result of one pack download run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Pack that was requested or resolved.
    pub pack_id: Option<PackId>,

    /// Display name of the resolved pack.
    pub pack_name: Option<String>,

    /// Models downloaded and materialized, in manifest order.
    pub succeeded: Vec<DownloadedModel>,

    /// Models that failed, in manifest order.
    pub failed: Vec<FailedModel>,

    /// Set when the manifest could not be resolved; nothing was downloaded.
    pub manifest_failure: Option<ManifestFailure>,

    /// Set when the run was superseded or cancelled before finishing.
    pub cancelled: bool,
}

impl PipelineReport {
    /// Report for a run whose manifest could not be resolved.
    pub fn manifest_failed(
        pack_id: Option<PackId>,
        error: &PackError,
        requires_login: bool,
    ) -> Self {
        Self {
            pack_id,
            manifest_failure: Some(ManifestFailure {
                reason: error.to_string(),
                requires_login,
            }),
            ..Self::default()
        }
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Failure recorded for the named model, if any.
    pub fn failure_for(&self, model: &str) -> Option<&FailedModel> {
        self.failed.iter().find(|f| f.model == model)
    }

    /// True when the manifest resolved, every model succeeded and the run
    /// was not cancelled.
    pub fn is_success(&self) -> bool {
        self.manifest_failure.is_none() && self.failed.is_empty() && !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_successful() {
        assert!(PipelineReport::default().is_success());
    }

    #[test]
    fn manifest_failure_is_not_successful() {
        let report = PipelineReport::manifest_failed(
            None,
            &PackError::Manifest {
                reason: "HTTP 500".into(),
            },
            false,
        );
        assert!(!report.is_success());
        let failure = report.manifest_failure.unwrap();
        assert!(failure.reason.contains("HTTP 500"));
        assert!(!failure.requires_login);
    }

    #[test]
    fn failures_are_classified_by_stage() {
        let failed = FailedModel::new(
            "Chair",
            &PackError::Materialization {
                model: "Chair".into(),
                reason: "disk full".into(),
            },
        );
        assert_eq!(failed.kind, FailureKind::Materialization);

        let failed = FailedModel::new(
            "Table",
            &PackError::ResourceDownload {
                url: "https://cdn/x".into(),
                reason: "HTTP 404".into(),
            },
        );
        assert_eq!(failed.kind, FailureKind::ResourceDownload);
        assert!(failed.reason.contains("HTTP 404"));
    }

    #[test]
    fn cancelled_report_is_not_successful() {
        let report = PipelineReport {
            cancelled: true,
            ..PipelineReport::default()
        };
        assert!(!report.is_success());
    }
}
