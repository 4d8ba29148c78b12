//! Bridge operation names and their argument/result shapes.

use serde::{Deserialize, Serialize};

use assetpack_core::{ModelRef, PackId, PackManifest, PackSummary, Resource, ResourceKind};

// ============================================================================
// Operation Names
// ============================================================================

/// Create a callback session for out-of-band login.
pub const CALLBACK_CREATE: &str = "callback/create";

/// Poll the status of a callback session.
pub const CALLBACK_POLL: &str = "callback/poll";

/// Exchange a refresh token for a new token pair.
pub const AUTH_REFRESH_TOKEN: &str = "auth/refreshToken";

/// List packs available to the user.
pub const PACK_LIST: &str = "pack/list";

/// Resolve the downloadable model list of a pack.
pub const PACK_DOWNLOAD: &str = "pack/download";

// ============================================================================
// Argument/Result Types
// ============================================================================

/// Empty argument object, serialized as `{}`.
#[derive(Debug, Default, Serialize)]
pub struct NoArgs {}

/// Result of `callback/create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackCreated {
    pub id: String,
}

/// Arguments of `callback/poll`.
#[derive(Debug, Serialize)]
pub struct CallbackPollArgs<'a> {
    pub id: &'a str,
}

/// Result of `callback/poll`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPoll {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Arguments of `auth/refreshToken`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenArgs<'a> {
    pub refresh_token: &'a str,
}

/// Result of `auth/refreshToken`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub id_token: String,
    pub refresh_token: String,
}

/// Result of `pack/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct PackListResult {
    pub packs: Vec<PackSummary>,
}

/// Arguments of `pack/download`. Without a pack id the server picks the
/// user's default pack.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackDownloadArgs<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_id: Option<&'a str>,
}

/// Result of `pack/download`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackDownloadResult {
    #[serde(default)]
    pub pack_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub models: Vec<PackModel>,
}

/// One model entry of `pack/download`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackModel {
    pub name: String,
    #[serde(default)]
    pub fbx_url: Option<String>,
    #[serde(default)]
    pub diffuse_url: Option<String>,
}

impl PackModel {
    fn into_model_ref(self) -> ModelRef {
        let resources = [
            (ResourceKind::Mesh, self.fbx_url),
            (ResourceKind::Diffuse, self.diffuse_url),
        ]
        .into_iter()
        .filter_map(|(kind, url)| {
            // The service sends empty strings for absent resources.
            url.filter(|u| !u.trim().is_empty())
                .map(|url| Resource { kind, url })
        })
        .collect();

        ModelRef {
            name: self.name,
            resources,
        }
    }
}

impl PackDownloadResult {
    /// Convert into a manifest, keeping the requested id when the server
    /// does not echo one back.
    pub fn into_manifest(self, requested: Option<&PackId>) -> PackManifest {
        let pack_id = self
            .pack_id
            .and_then(|id| PackId::new(id).ok())
            .or_else(|| requested.cloned());

        PackManifest {
            pack_id,
            name: self.name,
            models: self
                .models
                .into_iter()
                .map(PackModel::into_model_ref)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn no_args_serializes_as_empty_object() {
        assert_eq!(serde_json::to_value(NoArgs::default()).unwrap(), json!({}));
    }

    #[test]
    fn pack_download_args_omit_missing_id() {
        let args = PackDownloadArgs { pack_id: None };
        assert_eq!(serde_json::to_value(&args).unwrap(), json!({}));

        let args = PackDownloadArgs {
            pack_id: Some("pk_1"),
        };
        assert_eq!(
            serde_json::to_value(&args).unwrap(),
            json!({"packId": "pk_1"})
        );
    }

    #[test]
    fn manifest_conversion_drops_empty_urls() {
        let result: PackDownloadResult = serde_json::from_value(json!({
            "models": [
                {"name": "Chair", "fbxUrl": "https://cdn/chair.fbx", "diffuseUrl": ""},
                {"name": "Lamp"}
            ]
        }))
        .unwrap();

        let requested = PackId::new("pk_9").unwrap();
        let manifest = result.into_manifest(Some(&requested));

        assert_eq!(manifest.pack_id, Some(requested));
        assert_eq!(manifest.models.len(), 2);
        assert_eq!(
            manifest.models[0].resources,
            vec![Resource {
                kind: ResourceKind::Mesh,
                url: "https://cdn/chair.fbx".to_string()
            }]
        );
        assert!(manifest.models[1].resources.is_empty());
    }

    #[test]
    fn results_without_their_list_are_rejected() {
        let err = serde_json::from_value::<PackDownloadResult>(json!({"error": "pack not found"}))
            .unwrap_err();
        assert!(err.to_string().contains("models"));
        assert!(serde_json::from_value::<PackListResult>(json!({"error": "denied"})).is_err());
    }

    #[test]
    fn poll_result_tolerates_missing_fields() {
        let poll: CallbackPoll = serde_json::from_value(json!({"status": "pending"})).unwrap();
        assert_eq!(poll.status, "pending");
        assert!(poll.id_token.is_none());
    }
}
