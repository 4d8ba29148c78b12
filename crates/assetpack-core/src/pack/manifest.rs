//! Pack manifest types.

use serde::{Deserialize, Serialize};

use crate::types::{PackId, Slug};

/// Kind of file a model resource materializes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// The model geometry.
    Mesh,
    /// The diffuse (albedo) texture.
    Diffuse,
}

impl ResourceKind {
    /// Fixed local file name for this kind of resource.
    pub fn file_name(self) -> &'static str {
        match self {
            ResourceKind::Mesh => "model.fbx",
            ResourceKind::Diffuse => "diffuse.png",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Mesh => "mesh",
            ResourceKind::Diffuse => "diffuse",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote file belonging to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub url: String,
}

/// A model listed in a pack manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Display name, unique within the pack.
    pub name: String,

    /// Remote files to download, at most one per kind.
    pub resources: Vec<Resource>,
}

impl ModelRef {
    /// Filesystem-safe directory name for this model.
    pub fn slug(&self) -> Slug {
        Slug::new(&self.name)
    }
}

/// The resolved list of models for a pack.
///
/// Manifests are re-fetched for every download run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    /// Identifier of the pack, if the server reported one.
    pub pack_id: Option<PackId>,

    /// Display name of the pack, if the server reported one.
    pub name: Option<String>,

    /// Models in manifest order.
    pub models: Vec<ModelRef>,
}

impl PackManifest {
    /// Name used for display and for the pack's directory.
    ///
    /// Prefers the display name, then the pack id, then `default` for the
    /// server-side default pack.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.pack_id.as_ref().map(PackId::as_str))
            .unwrap_or("default")
    }

    /// Filesystem-safe directory name for this pack.
    pub fn slug(&self) -> Slug {
        Slug::new(self.label())
    }
}

/// A pack available to the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSummary {
    pub id: PackId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_count: Option<u32>,
}
