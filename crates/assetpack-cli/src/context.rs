//! Wiring of the bridge components from resolved settings.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use assetpack_core::PackLayout;
use assetpack_core::traits::{Browser, CredentialStore};
use assetpack_file::{DescriptorMaterializer, FileCredentialStore};
use assetpack_rpc::{AuthorizedClient, CallbackFlow, PackDownloader, RpcClient};

use crate::config::Settings;

/// Shared state of one CLI invocation.
pub struct Context {
    pub settings: Settings,
    store: Arc<FileCredentialStore>,
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(FileCredentialStore::new(&settings.data_dir));
        Self { settings, store }
    }

    pub fn store(&self) -> Arc<dyn CredentialStore> {
        self.store.clone()
    }

    pub fn credential_path(&self) -> std::path::PathBuf {
        self.store.credential_path(&self.settings.flavor)
    }

    pub fn rpc(&self) -> Result<RpcClient> {
        RpcClient::new(self.settings.api.clone()).context("Failed to build HTTP client")
    }

    pub fn authorized(&self) -> Result<AuthorizedClient> {
        Ok(
            AuthorizedClient::new(self.rpc()?, self.store(), self.settings.flavor.clone())
                .with_expiry_policy(self.settings.expiry.clone()),
        )
    }

    pub fn callback_flow(&self, browser: Arc<dyn Browser>) -> Result<CallbackFlow> {
        Ok(CallbackFlow::new(
            self.rpc()?,
            self.store(),
            self.settings.flavor.clone(),
            browser,
            self.settings.website.clone(),
        )
        .with_poll_config(self.settings.poll)
        .with_expiry_policy(self.settings.expiry.clone()))
    }

    pub fn downloader(&self, out: &Path) -> Result<PackDownloader> {
        PackDownloader::new(
            self.authorized()?,
            PackLayout::new(out),
            Arc::new(DescriptorMaterializer::new()),
        )
        .context("Failed to build HTTP client")
    }
}
