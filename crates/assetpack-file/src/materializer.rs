//! Default materializer writing a model descriptor next to its files.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use assetpack_core::error::{Error, PackError};
use assetpack_core::traits::Materializer;
use assetpack_core::{DownloadedModel, Result};

/// File name of the descriptor written into each model directory.
pub const DESCRIPTOR_FILE: &str = "model.json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelDescriptor<'a> {
    name: &'a str,
    slug: &'a str,
    files: BTreeMap<&'static str, String>,
    materialized_at: DateTime<Utc>,
}

/// Materializer producing a `model.json` descriptor that lists the model's
/// downloaded files by kind.
///
/// Hosts with a real asset importer plug in their own [`Materializer`];
/// this one gives every download a stable, machine-readable entry point.
#[derive(Debug, Default, Clone, Copy)]
pub struct DescriptorMaterializer;

impl DescriptorMaterializer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Materializer for DescriptorMaterializer {
    #[instrument(skip_all, fields(model = %model.name))]
    async fn materialize(&self, model: &DownloadedModel) -> Result<()> {
        let failed = |reason: String| {
            Error::Pack(PackError::Materialization {
                model: model.name.clone(),
                reason,
            })
        };

        let files = model
            .files
            .iter()
            .map(|f| {
                let file_name = f
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (f.kind.as_str(), file_name)
            })
            .collect();

        let descriptor = ModelDescriptor {
            name: &model.name,
            slug: model.slug.as_str(),
            files,
            materialized_at: Utc::now(),
        };

        let content =
            serde_json::to_string_pretty(&descriptor).map_err(|e| failed(e.to_string()))?;

        let path = model.directory.join(DESCRIPTOR_FILE);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| failed(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Wrote model descriptor");
        Ok(())
    }
}
