//! Pack manifest, layout and download report types.
//!
//! The download pipeline itself lives in `assetpack-rpc`; this module only
//! defines the data it consumes and produces.

mod layout;
mod manifest;
mod report;

pub use layout::PackLayout;
pub use manifest::{ModelRef, PackManifest, PackSummary, Resource, ResourceKind};
pub use report::{DownloadedFile, DownloadedModel, FailedModel, FailureKind, ManifestFailure, PipelineReport};
