//! The persisted login credential and its expiry policy.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{Error, InvalidInputError};
use crate::tokens::{AccessToken, RefreshToken};

/// Validity window stamped on an access token when it is issued.
pub const DEFAULT_ACCESS_WINDOW_MINUTES: i64 = 50;

/// Safety margin subtracted from a token's own `exp` claim.
pub const DEFAULT_CLAIM_MARGIN_MINUTES: i64 = 5;

/// An access/refresh token pair plus the instant the access token stops
/// being usable.
///
/// The pair is always replaced as a whole so a refreshed access token is
/// never observed next to the refresh token it was minted from.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: AccessToken,
    refresh_token: RefreshToken,
    access_expiry: DateTime<Utc>,
}

impl Credential {
    /// Create a credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is empty, since a refresh token
    /// is what makes a user "logged in".
    pub fn new(
        access_token: AccessToken,
        refresh_token: RefreshToken,
        access_expiry: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if refresh_token.is_empty() {
            return Err(InvalidInputError::Credential {
                reason: "refresh token must not be empty".to_string(),
            }
            .into());
        }
        Ok(Self {
            access_token,
            refresh_token,
            access_expiry,
        })
    }

    /// Create a credential for a freshly issued token pair, stamping the
    /// access expiry with `policy`.
    pub fn issued(
        access_token: AccessToken,
        refresh_token: RefreshToken,
        policy: &ExpiryPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let access_expiry = policy.expiry_for(&access_token, now);
        Self::new(access_token, refresh_token, access_expiry)
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &RefreshToken {
        &self.refresh_token
    }

    pub fn access_expiry(&self) -> DateTime<Utc> {
        self.access_expiry
    }

    /// Returns true if the access token must be refreshed before use.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_expiry
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("tokens", &"[REDACTED]")
            .field("access_expiry", &self.access_expiry)
            .finish()
    }
}

/// How the client decides when an access token expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Treat every token as valid for a fixed window after it was issued,
    /// regardless of what the server embeds in it.
    Fixed(Duration),

    /// Read the JWT `exp` claim and expire `margin` before it. Tokens without
    /// a readable claim fall back to the fixed window.
    TokenClaim { margin: Duration, fallback: Duration },
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        ExpiryPolicy::Fixed(Duration::minutes(DEFAULT_ACCESS_WINDOW_MINUTES))
    }
}

impl ExpiryPolicy {
    /// Claim-based policy with the default margin and fallback window.
    pub fn token_claim() -> Self {
        ExpiryPolicy::TokenClaim {
            margin: Duration::minutes(DEFAULT_CLAIM_MARGIN_MINUTES),
            fallback: Duration::minutes(DEFAULT_ACCESS_WINDOW_MINUTES),
        }
    }

    /// Compute the expiry instant for a token issued at `now`.
    pub fn expiry_for(&self, token: &AccessToken, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ExpiryPolicy::Fixed(window) => now + *window,
            ExpiryPolicy::TokenClaim { margin, fallback } => match jwt_expiry(token.as_str()) {
                Some(exp) => exp - *margin,
                None => now + *fallback,
            },
        }
    }
}

/// Extract the `exp` claim of a JWT without verifying its signature.
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload = parts.next()?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    let exp = value.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}
