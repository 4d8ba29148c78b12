//! Authorized calls with transparent token refresh.

use std::sync::Arc;

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use assetpack_core::error::AuthError;
use assetpack_core::traits::CredentialStore;
use assetpack_core::{
    AccessToken, Credential, ExpiryPolicy, Flavor, PackId, PackManifest, PackSummary,
    RefreshToken, Result,
};

use crate::client::RpcClient;
use crate::operations::{
    PACK_DOWNLOAD, PACK_LIST, PackDownloadArgs, PackDownloadResult, PackListResult, NoArgs,
};

/// RPC client bound to the stored credential of one flavor.
///
/// Before each call the access token is checked against its expiry and
/// refreshed if needed. Refreshes are serialized, so concurrent callers that
/// all find an expired token trigger a single `auth/refreshToken`. A failed
/// refresh clears the stored credential: the user has to log in again.
#[derive(Clone)]
pub struct AuthorizedClient {
    rpc: RpcClient,
    store: Arc<dyn CredentialStore>,
    flavor: Flavor,
    policy: ExpiryPolicy,
    refresh_lock: Arc<Mutex<()>>,
}

impl AuthorizedClient {
    pub fn new(rpc: RpcClient, store: Arc<dyn CredentialStore>, flavor: Flavor) -> Self {
        Self {
            rpc,
            store,
            flavor,
            policy: ExpiryPolicy::default(),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Use `policy` to stamp the expiry of refreshed access tokens.
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn flavor(&self) -> &Flavor {
        &self.flavor
    }

    pub fn expiry_policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// The stored credential, if any.
    pub fn credential(&self) -> Result<Option<Credential>> {
        self.store.load(&self.flavor)
    }

    /// True when a refresh token is stored. The access token may still be
    /// expired.
    pub fn is_logged_in(&self) -> Result<bool> {
        Ok(self.credential()?.is_some())
    }

    /// Forget the stored credential.
    #[instrument(skip(self), fields(flavor = %self.flavor))]
    pub fn logout(&self) -> Result<()> {
        self.store.clear(&self.flavor)?;
        info!("Logged out");
        Ok(())
    }

    /// Invoke `name` with a valid access token attached.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotLoggedIn`] without a stored credential and
    /// [`AuthError::RefreshFailed`] when an expired token could not be
    /// renewed. Otherwise whatever the underlying call returns.
    pub async fn call<A, R>(&self, name: &str, args: &A) -> Result<R>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let credential = self.valid_credential().await?;
        self.rpc
            .call(name, args, Some(credential.access_token()))
            .await
    }

    /// Force a refresh regardless of the current expiry.
    #[instrument(skip(self), fields(flavor = %self.flavor))]
    pub async fn refresh(&self) -> Result<Credential> {
        let _guard = self.refresh_lock.lock().await;
        let current = self.load_required()?;
        self.refresh_with(&current).await
    }

    /// List packs available to the user.
    pub async fn list_packs(&self) -> Result<Vec<PackSummary>> {
        let result: PackListResult = self.call(PACK_LIST, &NoArgs::default()).await?;
        Ok(result.packs)
    }

    /// Resolve the model list of a pack, or of the user's default pack.
    pub async fn pack_manifest(&self, pack_id: Option<&PackId>) -> Result<PackManifest> {
        let args = PackDownloadArgs {
            pack_id: pack_id.map(PackId::as_str),
        };
        let result: PackDownloadResult = self.call(PACK_DOWNLOAD, &args).await?;
        Ok(result.into_manifest(pack_id))
    }

    fn load_required(&self) -> Result<Credential> {
        Ok(self
            .store
            .load(&self.flavor)?
            .ok_or(AuthError::NotLoggedIn)?)
    }

    async fn valid_credential(&self) -> Result<Credential> {
        let current = self.load_required()?;
        if !current.is_expired() {
            return Ok(current);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while this one waited.
        let current = self.load_required()?;
        if !current.is_expired() {
            return Ok(current);
        }

        debug!(expiry = %current.access_expiry(), "Access token expired");
        self.refresh_with(&current).await
    }

    /// Exchange the refresh token and persist the new pair. Any failure
    /// clears the store.
    async fn refresh_with(&self, current: &Credential) -> Result<Credential> {
        let renewed = match self.rpc.refresh_token(current.refresh_token()).await {
            Ok(pair) => Credential::issued(
                AccessToken::new(pair.id_token),
                RefreshToken::new(pair.refresh_token),
                &self.policy,
                Utc::now(),
            ),
            Err(e) => Err(e),
        };

        match renewed {
            Ok(credential) => {
                self.store.save(&self.flavor, &credential)?;
                info!(expiry = %credential.access_expiry(), "Refreshed access token");
                Ok(credential)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed; clearing credential");
                if let Err(clear_err) = self.store.clear(&self.flavor) {
                    warn!(error = %clear_err, "Failed to clear credential");
                }
                Err(AuthError::RefreshFailed {
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }
}

impl std::fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("rpc", &self.rpc)
            .field("flavor", &self.flavor)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
