//! assetpack-core - Core types and traits for the Asset Pack bridge.

pub mod credential;
pub mod error;
pub mod pack;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credential::{Credential, ExpiryPolicy};
pub use error::Error;
pub use pack::{
    DownloadedFile, DownloadedModel, FailedModel, FailureKind, ManifestFailure, ModelRef,
    PackLayout, PackManifest, PackSummary, PipelineReport, Resource, ResourceKind,
};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{
    Browser, CredentialStore, Materializer, MemoryCredentialStore, NoBrowser, NoopMaterializer,
};
pub use types::{Flavor, PackId, ServiceUrl, Slug};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
