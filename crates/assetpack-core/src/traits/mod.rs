//! Seams between the bridge core and its collaborators.

mod browser;
mod credential_store;
mod materializer;

pub use browser::{Browser, NoBrowser};
pub use credential_store::{CredentialStore, MemoryCredentialStore};
pub use materializer::{Materializer, NoopMaterializer};
