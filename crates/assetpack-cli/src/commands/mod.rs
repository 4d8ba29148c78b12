//! Subcommand implementations.

pub mod download;
pub mod list_packs;
pub mod login;
pub mod logout;
pub mod refresh_token;
pub mod whoami;

/// Hint appended to errors that require a fresh login.
pub(crate) const LOGIN_HINT: &str = "Not logged in. Run 'assetpack login' first.";

/// Attach a user-facing message to a bridge error, pointing at `login` when
/// the stored credential is missing or no longer usable.
pub(crate) fn describe(err: assetpack_core::Error, action: &str) -> anyhow::Error {
    let message = if err.requires_login() {
        LOGIN_HINT
    } else {
        action
    };
    anyhow::Error::new(err).context(message.to_string())
}
