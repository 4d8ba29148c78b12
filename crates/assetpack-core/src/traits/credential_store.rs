//! Credential store trait and an in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::types::Flavor;
use crate::{Credential, Result};

/// Persistent storage for the login credential of each flavor.
///
/// Implementations must replace the whole credential in `save`, so readers
/// see either the old token pair or the new one, never a mix.
pub trait CredentialStore: Send + Sync {
    /// Load the credential for `flavor`; `None` means logged out.
    fn load(&self, flavor: &Flavor) -> Result<Option<Credential>>;

    /// Store `credential` for `flavor`, replacing any previous one.
    fn save(&self, flavor: &Flavor, credential: &Credential) -> Result<()>;

    /// Forget the credential for `flavor`. Clearing twice is not an error.
    fn clear(&self, flavor: &Flavor) -> Result<()>;
}

/// Process-local credential store, useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<Flavor, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `credential` for `flavor`.
    pub fn with_credential(flavor: &Flavor, credential: Credential) -> Self {
        let store = Self::new();
        store
            .entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(flavor.clone(), credential);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, flavor: &Flavor) -> Result<Option<Credential>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(flavor).cloned())
    }

    fn save(&self, flavor: &Flavor, credential: &Credential) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(flavor.clone(), credential.clone());
        Ok(())
    }

    fn clear(&self, flavor: &Flavor) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(flavor);
        Ok(())
    }
}
