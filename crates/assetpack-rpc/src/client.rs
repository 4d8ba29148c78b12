//! Bridge RPC client.

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace};

use assetpack_core::error::{Error, TransportError};
use assetpack_core::{AccessToken, RefreshToken, Result, ServiceUrl};

use crate::envelope::{Envelope, extract_result};
use crate::operations::{
    AUTH_REFRESH_TOKEN, CALLBACK_CREATE, CALLBACK_POLL, CallbackCreated, CallbackPoll,
    CallbackPollArgs, NoArgs, RefreshTokenArgs, TokenPair,
};

/// Path of the single RPC endpoint below the API base URL.
pub const BRIDGE_PATH: &str = "bridge";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Map a reqwest failure onto the transport taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let message = err.to_string();
    let transport = if err.is_timeout() {
        TransportError::Timeout {
            duration_ms: DEFAULT_TIMEOUT.as_millis() as u64,
        }
    } else if err.is_connect() {
        TransportError::Connection { message }
    } else {
        TransportError::Http { message }
    };
    Error::Transport(transport)
}

/// Build the HTTP client shared by the bridge components.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("assetpack/", env!("CARGO_PKG_VERSION")))
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(transport_error)
}

/// Build the HTTP client used for resource downloads.
///
/// Only connecting is bounded; large files may take as long as they need.
pub fn download_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("assetpack/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(transport_error)
}

/// Client for the bridge endpoint.
///
/// Every operation is a POST of `{"data": {"name", "args"}}` to
/// `<api>/bridge`, optionally carrying a bearer token. The client is stateless
/// and cheap to clone.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    api: ServiceUrl,
    endpoint: String,
}

impl RpcClient {
    /// Create a client for the given API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api: ServiceUrl) -> Result<Self> {
        Ok(Self::with_http_client(api, http_client()?))
    }

    /// Create a client reusing an existing HTTP client.
    pub fn with_http_client(api: ServiceUrl, client: reqwest::Client) -> Self {
        let endpoint = api.join(BRIDGE_PATH);
        Self {
            client,
            api,
            endpoint,
        }
    }

    /// Returns the API base URL.
    pub fn api(&self) -> &ServiceUrl {
        &self.api
    }

    /// Returns the full endpoint URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Invoke a named operation and decode its `result`.
    ///
    /// # Errors
    ///
    /// Transport errors for network failures and non-2xx statuses, decode
    /// errors when the body carries no usable `result`.
    #[instrument(skip(self, args, token), fields(api = %self.api, authed = token.is_some()))]
    pub async fn call<A, R>(&self, name: &str, args: &A, token: Option<&AccessToken>) -> Result<R>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        debug!(name, "RPC call");

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&Envelope::new(name, args));
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        trace!(status = %status, len = body.len(), "RPC response");

        if !status.is_success() {
            return Err(TransportError::status(status.as_u16(), &body).into());
        }

        Ok(extract_result(&body)?)
    }

    /// Open a new callback session.
    pub async fn create_callback(&self) -> Result<CallbackCreated> {
        self.call(CALLBACK_CREATE, &NoArgs::default(), None).await
    }

    /// Poll a callback session.
    pub async fn poll_callback(&self, id: &str) -> Result<CallbackPoll> {
        self.call(CALLBACK_POLL, &CallbackPollArgs { id }, None).await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh_token(&self, refresh_token: &RefreshToken) -> Result<TokenPair> {
        let args = RefreshTokenArgs {
            refresh_token: refresh_token.as_str(),
        };
        self.call(AUTH_REFRESH_TOKEN, &args, None).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use assetpack_core::error::DecodeError;

    use super::*;

    fn client(server: &MockServer) -> RpcClient {
        RpcClient::new(ServiceUrl::new(server.uri()).unwrap()).unwrap()
    }

    #[test]
    fn endpoint_is_below_api_base() {
        let rpc = RpcClient::new(ServiceUrl::new("https://api.example.com/v1/").unwrap()).unwrap();
        assert_eq!(rpc.endpoint(), "https://api.example.com/v1/bridge");
    }

    #[tokio::test]
    async fn call_posts_envelope_and_decodes_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bridge"))
            .and(body_json(json!({"data": {"name": "callback/create", "args": {}}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"ok":true,"result":{"id":"abc"}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server).create_callback().await.unwrap();
        assert_eq!(created.id, "abc");
    }

    #[tokio::test]
    async fn call_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"n": 1}})))
            .expect(1)
            .mount(&server)
            .await;

        let token = AccessToken::new("access-1");
        let value: Value = client(&server)
            .call("pack/list", &json!({}), Some(&token))
            .await
            .unwrap();
        assert_eq!(value, json!({"n": 1}));
    }

    #[tokio::test]
    async fn non_success_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).create_callback().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::Status { status: 500, ref body }) if body == "boom"
        ));
    }

    #[tokio::test]
    async fn body_without_result_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"error":"x"}"#))
            .mount(&server)
            .await;

        let err = client(&server).create_callback().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::MissingResult { .. })
        ));
    }

    #[tokio::test]
    async fn refresh_sends_refresh_token_in_args() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "data": {"name": "auth/refreshToken", "args": {"refreshToken": "r1"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"idToken": "a2", "refreshToken": "r2"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pair = client(&server)
            .refresh_token(&RefreshToken::new("r1"))
            .await
            .unwrap();
        assert_eq!(pair.id_token, "a2");
        assert_eq!(pair.refresh_token, "r2");
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let rpc = RpcClient::new(ServiceUrl::new("http://127.0.0.1:9").unwrap()).unwrap();
        let err = rpc.create_callback().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
