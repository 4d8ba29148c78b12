//! Post-download materialization trait.

use async_trait::async_trait;

use crate::Result;
use crate::pack::DownloadedModel;

/// Turns a downloaded model's raw files into host-specific artifacts
/// (imported assets, materials, prefabs, ...).
///
/// The download pipeline calls this once per fully downloaded model and
/// records an `Err` as a materialization failure for that model only.
#[async_trait]
pub trait Materializer: Send + Sync {
    async fn materialize(&self, model: &DownloadedModel) -> Result<()>;
}

/// Materializer that leaves the downloaded files as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMaterializer;

#[async_trait]
impl Materializer for NoopMaterializer {
    async fn materialize(&self, _model: &DownloadedModel) -> Result<()> {
        Ok(())
    }
}
