//! Deterministic local paths for downloaded packs.

use std::path::{Path, PathBuf};

use super::manifest::{ModelRef, PackManifest, ResourceKind};
use crate::types::Slug;

/// Maps pack and model names onto a directory tree:
/// `<root>/<pack slug>/<model slug>/<fixed file name>`.
///
/// Paths depend only on names, so re-running a download overwrites the
/// files of the previous run in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackLayout {
    root: PathBuf,
}

impl PackLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every model of a pack.
    pub fn pack_dir(&self, manifest: &PackManifest) -> PathBuf {
        self.root.join(manifest.slug())
    }

    /// Directory holding one model's files.
    pub fn model_dir(&self, pack: &Slug, model: &ModelRef) -> PathBuf {
        self.root.join(pack).join(model.slug())
    }

    /// Final path of one resource file.
    pub fn resource_path(&self, pack: &Slug, model: &ModelRef, kind: ResourceKind) -> PathBuf {
        self.model_dir(pack, model).join(kind.file_name())
    }
}
