//! assetpack-file - Filesystem-backed collaborators for the Asset Pack bridge.

mod materializer;
mod store;

pub use materializer::{DESCRIPTOR_FILE, DescriptorMaterializer};
pub use store::FileCredentialStore;
