//! Error types for the Asset Pack bridge.
//!
//! A single error type with one variant per failure category: transport,
//! response decoding, authentication, pack processing, local storage and
//! input validation. Callers match on the category they care about and
//! display the rest.

use thiserror::Error;

/// Maximum length for response bodies carried inside errors.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// The unified error type for bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, non-2xx status).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response arrived but did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Authentication errors (not logged in, refresh rejected, callback error).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Pack manifest, resource download or materialization errors.
    #[error("pack error: {0}")]
    Pack(#[from] PackError),

    /// Local persistence errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors (invalid URL, flavor, pack id).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// The operation was cancelled before it finished.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if this error means the user has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::NotLoggedIn) | Error::Auth(AuthError::RefreshFailed { .. })
        )
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl TransportError {
    /// Build a status error, truncating the body to keep messages readable.
    pub fn status(status: u16, body: &str) -> Self {
        TransportError::Status {
            status,
            body: truncate_body(body),
        }
    }
}

/// Errors raised while turning a response body into a typed value.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body carries no `result` object.
    #[error("response has no result object: {body}")]
    MissingResult { body: String },

    /// The `result` object did not match the expected shape.
    #[error("unexpected result shape: {message}")]
    Json { message: String },
}

impl DecodeError {
    pub fn missing_result(body: &str) -> Self {
        DecodeError::MissingResult {
            body: truncate_body(body),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json {
            message: err.to_string(),
        }
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A privileged call was attempted without a stored refresh token.
    #[error("not logged in")]
    NotLoggedIn,

    /// The refresh token was rejected; stored credentials have been cleared.
    #[error("token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    /// The server reported an explicit error for the callback session.
    #[error("login failed: {message}")]
    Callback { message: String },

    /// The callback session stayed pending for too long.
    #[error("login timed out after {elapsed_secs}s")]
    PollTimeout { elapsed_secs: u64 },

    /// The callback poll returned a status this client does not understand.
    #[error("unknown callback status '{status}'")]
    UnknownStatus { status: String },

    /// A successful callback did not carry the expected tokens.
    #[error("callback succeeded without {missing}")]
    MissingToken { missing: &'static str },
}

/// Pack pipeline errors.
#[derive(Debug, Clone, Error)]
pub enum PackError {
    /// Resolving the pack's model list failed.
    #[error("could not resolve pack manifest: {reason}")]
    Manifest { reason: String },

    /// A single resource file could not be fetched or written.
    #[error("download of {url} failed: {reason}")]
    ResourceDownload { url: String, reason: String },

    /// The post-download materialization step failed.
    #[error("materialization of {model} failed: {reason}")]
    Materialization { model: String, reason: String },

    /// The manifest lists a model without any resource URL.
    #[error("model {model} has no resources")]
    NoResources { model: String },
}

/// Local persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// A stored file exists but could not be parsed.
    #[error("corrupt data in {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid service URL.
    #[error("invalid service URL '{value}': {reason}")]
    ServiceUrl { value: String, reason: String },

    /// Invalid flavor discriminator.
    #[error("invalid flavor '{value}': {reason}")]
    Flavor { value: String, reason: String },

    /// Invalid pack identifier.
    #[error("invalid pack id '{value}': {reason}")]
    PackId { value: String, reason: String },

    /// Invalid credential material.
    #[error("invalid credential: {reason}")]
    Credential { reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Truncate a response body to avoid carrying excessive data in errors.
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}
