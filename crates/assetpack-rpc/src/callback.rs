//! Browser-based login through a polled callback session.
//!
//! The flow opens a callback session, sends the user to the website's login
//! page tagged with the session id, then polls the session until the
//! website reports success or failure. Only one flow runs per
//! [`CallbackFlow`]: starting a new one cancels the previous one, which
//! then neither persists tokens nor reports an outcome.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use assetpack_core::error::{AuthError, Error};
use assetpack_core::traits::{Browser, CredentialStore};
use assetpack_core::{
    AccessToken, Credential, ExpiryPolicy, Flavor, RefreshToken, Result, ServiceUrl,
};

use crate::client::RpcClient;
use crate::operations::CallbackPoll;

/// Default delay between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default time after which an unanswered session is abandoned.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Polling cadence of a login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// `None` polls until cancelled.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(DEFAULT_POLL_TIMEOUT),
        }
    }
}

/// Observable state of a login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Creating,
    AwaitingCallback {
        session_id: String,
        login_url: String,
        /// Number of `pending` answers received so far.
        polls: u32,
    },
    LoggedIn,
    Failed {
        message: String,
    },
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::LoggedIn | FlowState::Failed { .. })
    }
}

/// Receiving side of a started flow.
#[derive(Debug)]
pub struct FlowHandle {
    states: mpsc::UnboundedReceiver<FlowState>,
    outcome: oneshot::Receiver<Result<()>>,
}

impl FlowHandle {
    /// Next state transition. `None` once the flow has ended.
    pub async fn next_state(&mut self) -> Option<FlowState> {
        self.states.recv().await
    }

    /// Wait for the flow to finish.
    ///
    /// Returns `None` if the flow was cancelled or superseded.
    pub async fn wait(self) -> Option<Result<()>> {
        self.outcome.await.ok()
    }
}

/// Drives the callback login flow for one flavor.
pub struct CallbackFlow {
    rpc: RpcClient,
    store: Arc<dyn CredentialStore>,
    flavor: Flavor,
    browser: Arc<dyn Browser>,
    website: ServiceUrl,
    poll: PollConfig,
    policy: ExpiryPolicy,
    active: Mutex<Option<CancellationToken>>,
}

impl CallbackFlow {
    pub fn new(
        rpc: RpcClient,
        store: Arc<dyn CredentialStore>,
        flavor: Flavor,
        browser: Arc<dyn Browser>,
        website: ServiceUrl,
    ) -> Self {
        Self {
            rpc,
            store,
            flavor,
            browser,
            website,
            poll: PollConfig::default(),
            policy: ExpiryPolicy::default(),
            active: Mutex::new(None),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Start a new flow, cancelling any flow already in progress.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> FlowHandle {
        let cancel = CancellationToken::new();
        {
            let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(previous) = active.replace(cancel.clone()) {
                debug!("Superseding running login flow");
                previous.cancel();
            }
        }

        let (state_tx, states) = mpsc::unbounded_channel();
        let (outcome_tx, outcome) = oneshot::channel();

        let runner = FlowRunner {
            rpc: self.rpc.clone(),
            store: Arc::clone(&self.store),
            flavor: self.flavor.clone(),
            browser: Arc::clone(&self.browser),
            website: self.website.clone(),
            poll: self.poll,
            policy: self.policy.clone(),
            cancel,
            states: state_tx,
        };

        tokio::spawn(async move {
            if let Some(result) = runner.run().await {
                let _ = outcome_tx.send(result);
            }
        });

        FlowHandle { states, outcome }
    }

    /// Cancel the running flow, if any.
    pub fn stop(&self) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(cancel) = active.take() {
            cancel.cancel();
        }
    }

    /// Run a flow to completion.
    ///
    /// # Errors
    ///
    /// The flow's failure, or [`Error::Cancelled`] if it was stopped or
    /// superseded.
    pub async fn login(&self) -> Result<()> {
        self.start().wait().await.unwrap_or(Err(Error::Cancelled))
    }
}

impl Drop for CallbackFlow {
    fn drop(&mut self) {
        self.stop();
    }
}

struct FlowRunner {
    rpc: RpcClient,
    store: Arc<dyn CredentialStore>,
    flavor: Flavor,
    browser: Arc<dyn Browser>,
    website: ServiceUrl,
    poll: PollConfig,
    policy: ExpiryPolicy,
    cancel: CancellationToken,
    states: mpsc::UnboundedSender<FlowState>,
}

impl FlowRunner {
    /// Returns `None` when cancelled.
    #[instrument(skip_all, fields(flavor = %self.flavor))]
    async fn run(self) -> Option<Result<()>> {
        self.emit(FlowState::Idle);
        self.emit(FlowState::Creating);

        let session = match self.cancellable(self.rpc.create_callback()).await? {
            Ok(session) => session,
            Err(e) => return self.fail(e),
        };
        let login_url = self.website.login_url(&session.id);
        info!(session = %session.id, %login_url, "Callback session created");

        if let Err(e) = self.browser.open(&login_url) {
            warn!(error = %e, "Could not open browser; continuing to poll");
        }

        let started = Instant::now();
        let mut polls = 0;
        loop {
            self.emit(FlowState::AwaitingCallback {
                session_id: session.id.clone(),
                login_url: login_url.clone(),
                polls,
            });

            self.cancellable(tokio::time::sleep(self.poll.interval))
                .await?;

            if let Some(timeout) = self.poll.timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    return self.fail(
                        AuthError::PollTimeout {
                            elapsed_secs: elapsed.as_secs(),
                        }
                        .into(),
                    );
                }
            }

            let poll = match self.cancellable(self.rpc.poll_callback(&session.id)).await? {
                Ok(poll) => poll,
                Err(e) => return self.fail(e),
            };

            match poll.status.as_str() {
                "pending" => {
                    polls += 1;
                    debug!(polls, "Callback pending");
                }
                "success" => return self.succeed(poll),
                "error" => {
                    let message = poll
                        .error
                        .unwrap_or_else(|| "login was rejected".to_string());
                    return self.fail(AuthError::Callback { message }.into());
                }
                other => {
                    return self.fail(
                        AuthError::UnknownStatus {
                            status: other.to_string(),
                        }
                        .into(),
                    );
                }
            }
        }
    }

    fn succeed(&self, poll: CallbackPoll) -> Option<Result<()>> {
        let tokens = match (poll.id_token, poll.refresh_token) {
            (Some(access), Some(refresh)) => Credential::issued(
                AccessToken::new(access),
                RefreshToken::new(refresh),
                &self.policy,
                Utc::now(),
            ),
            (None, _) => Err(AuthError::MissingToken { missing: "idToken" }.into()),
            (_, None) => Err(AuthError::MissingToken {
                missing: "refreshToken",
            }
            .into()),
        };
        let credential = match tokens {
            Ok(credential) => credential,
            Err(e) => return self.fail(e),
        };

        if self.cancel.is_cancelled() {
            return None;
        }
        if let Err(e) = self.store.save(&self.flavor, &credential) {
            return self.fail(e);
        }

        info!("Logged in");
        self.emit(FlowState::LoggedIn);
        Some(Ok(()))
    }

    fn fail(&self, err: Error) -> Option<Result<()>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        error!(error = %err, "Login flow failed");
        self.emit(FlowState::Failed {
            message: err.to_string(),
        });
        Some(Err(err))
    }

    /// Superseded or stopped runners stay silent.
    fn emit(&self, state: FlowState) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.states.send(state);
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use assetpack_core::error::InvalidInputError;
    use assetpack_core::traits::{MemoryCredentialStore, NoBrowser};

    use super::*;

    const FAST: PollConfig = PollConfig {
        interval: Duration::from_millis(10),
        timeout: Some(Duration::from_secs(10)),
    };

    #[derive(Default)]
    struct RecordingBrowser {
        opened: Mutex<Vec<String>>,
    }

    impl Browser for RecordingBrowser {
        fn open(&self, url: &str) -> Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct BrokenBrowser(AtomicUsize);

    impl Browser for BrokenBrowser {
        fn open(&self, _url: &str) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(InvalidInputError::Other {
                message: "no display".into(),
            }
            .into())
        }
    }

    fn flow(
        server: &MockServer,
        store: Arc<MemoryCredentialStore>,
        browser: Arc<dyn Browser>,
    ) -> CallbackFlow {
        let rpc = RpcClient::new(ServiceUrl::new(server.uri()).unwrap()).unwrap();
        let website = ServiceUrl::new("https://assetpack.example").unwrap();
        CallbackFlow::new(rpc, store, Flavor::prod(), browser, website).with_poll_config(FAST)
    }

    async fn mount_create(server: &MockServer, id: &str) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"data": {"name": "callback/create"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"id": id}})))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    fn poll_for(id: &str) -> impl wiremock::Match + 'static {
        body_partial_json(json!({"data": {"name": "callback/poll", "args": {"id": id}}}))
    }

    fn answer(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "result": body }))
    }

    async fn collect_states(handle: &mut FlowHandle) -> Vec<FlowState> {
        let mut states = Vec::new();
        while let Some(state) = handle.next_state().await {
            let done = state.is_terminal();
            states.push(state);
            if done {
                break;
            }
        }
        states
    }

    #[tokio::test]
    async fn pending_twice_then_success_logs_in() {
        let server = MockServer::start().await;
        mount_create(&server, "s1").await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(json!({"status": "pending"})))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(
                json!({"status": "success", "idToken": "a1", "refreshToken": "r1"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let browser = Arc::new(RecordingBrowser::default());
        let flow = flow(&server, store.clone(), browser.clone());

        let mut handle = flow.start();
        let states = collect_states(&mut handle).await;
        assert!(handle.wait().await.unwrap().is_ok());

        let login_url = "https://assetpack.example/login?callback=s1".to_string();
        let awaiting = |polls| FlowState::AwaitingCallback {
            session_id: "s1".into(),
            login_url: login_url.clone(),
            polls,
        };
        assert_eq!(
            states,
            vec![
                FlowState::Idle,
                FlowState::Creating,
                awaiting(0),
                awaiting(1),
                awaiting(2),
                FlowState::LoggedIn,
            ]
        );
        assert_eq!(*browser.opened.lock().unwrap(), vec![login_url.clone()]);

        let saved = store.load(&Flavor::prod()).unwrap().unwrap();
        assert_eq!(saved.access_token().as_str(), "a1");
        assert_eq!(saved.refresh_token().as_str(), "r1");
        assert!(!saved.is_expired());
    }

    #[tokio::test]
    async fn error_status_fails_with_message() {
        let server = MockServer::start().await;
        mount_create(&server, "s1").await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(json!({"status": "error", "error": "denied"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let flow = flow(&server, store.clone(), Arc::new(NoBrowser));

        let err = flow.login().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Callback { ref message }) if message == "denied"));
        assert!(store.load(&Flavor::prod()).unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_status_fails() {
        let server = MockServer::start().await;
        mount_create(&server, "s1").await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(json!({"status": "exploded"})))
            .mount(&server)
            .await;

        let flow = flow(&server, Arc::new(MemoryCredentialStore::new()), Arc::new(NoBrowser));
        let err = flow.login().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::UnknownStatus { ref status }) if status == "exploded"));
    }

    #[tokio::test]
    async fn success_without_refresh_token_fails() {
        let server = MockServer::start().await;
        mount_create(&server, "s1").await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(json!({"status": "success", "idToken": "a1"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let flow = flow(&server, store.clone(), Arc::new(NoBrowser));
        let err = flow.login().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::MissingToken {
                missing: "refreshToken"
            })
        ));
        assert!(store.load(&Flavor::prod()).unwrap().is_none());
    }

    #[tokio::test]
    async fn create_failure_fails_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let flow = flow(&server, Arc::new(MemoryCredentialStore::new()), Arc::new(NoBrowser));
        let mut handle = flow.start();
        let states = collect_states(&mut handle).await;

        assert_eq!(states[..2], [FlowState::Idle, FlowState::Creating]);
        assert!(matches!(states.last(), Some(FlowState::Failed { .. })));
        assert!(matches!(handle.wait().await, Some(Err(Error::Transport(_)))));
    }

    #[tokio::test]
    async fn browser_failure_does_not_stop_polling() {
        let server = MockServer::start().await;
        mount_create(&server, "s1").await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(
                json!({"status": "success", "idToken": "a1", "refreshToken": "r1"}),
            ))
            .mount(&server)
            .await;

        let browser = Arc::new(BrokenBrowser(AtomicUsize::new(0)));
        let flow = flow(&server, Arc::new(MemoryCredentialStore::new()), browser.clone());

        flow.login().await.unwrap();
        assert_eq!(browser.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unanswered_session_times_out() {
        let server = MockServer::start().await;
        mount_create(&server, "s1").await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(json!({"status": "pending"})))
            .mount(&server)
            .await;

        let flow = flow(&server, Arc::new(MemoryCredentialStore::new()), Arc::new(NoBrowser))
            .with_poll_config(PollConfig {
                interval: Duration::from_millis(10),
                timeout: Some(Duration::from_millis(50)),
            });

        let err = flow.login().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::PollTimeout { .. })));
    }

    #[tokio::test]
    async fn new_flow_supersedes_running_one() {
        let server = MockServer::start().await;
        mount_create(&server, "s1").await;
        mount_create(&server, "s2").await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(
                json!({"status": "success", "idToken": "old", "refreshToken": "old"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(poll_for("s2"))
            .respond_with(answer(
                json!({"status": "success", "idToken": "new", "refreshToken": "new"}),
            ))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let flow = flow(&server, store.clone(), Arc::new(NoBrowser)).with_poll_config(
            PollConfig {
                interval: Duration::from_millis(200),
                timeout: None,
            },
        );

        let mut first = flow.start();
        // Wait until the first flow sits between polls.
        loop {
            match first.next_state().await {
                Some(FlowState::AwaitingCallback { .. }) => break,
                Some(_) => continue,
                None => panic!("first flow ended early"),
            }
        }

        let second = flow.start();

        let mut leftover = Vec::new();
        while let Some(state) = first.next_state().await {
            leftover.push(state);
        }
        assert!(leftover.is_empty(), "{leftover:?}");
        assert!(first.wait().await.is_none());

        assert!(second.wait().await.unwrap().is_ok());
        let saved = store.load(&Flavor::prod()).unwrap().unwrap();
        assert_eq!(saved.access_token().as_str(), "new");
    }

    #[tokio::test]
    async fn stop_cancels_without_outcome() {
        let server = MockServer::start().await;
        mount_create(&server, "s1").await;
        Mock::given(method("POST"))
            .and(poll_for("s1"))
            .respond_with(answer(json!({"status": "pending"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let flow = flow(&server, store.clone(), Arc::new(NoBrowser));

        let mut handle = flow.start();
        while let Some(state) = handle.next_state().await {
            if matches!(state, FlowState::AwaitingCallback { polls: 1, .. }) {
                break;
            }
        }
        flow.stop();

        assert!(handle.wait().await.is_none());
        assert!(store.load(&Flavor::prod()).unwrap().is_none());
    }
}
