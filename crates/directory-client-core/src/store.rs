use anyhow::{anyhow, Context};
use closure_traits::{ChannelCallBack, ChannelCallBackOutput};
use directory_shared::{
    const_config::{
        path::{PathSpec, PATH_HEALTH_CHECK},
        storage::STORAGE_KEY_ACCESS_TOKEN,
    },
    token::AuthToken,
    uac::SessionUser,
};
use futures::channel::oneshot;
use reqwest::{Method, StatusCode};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::storage::SessionStorage;

pub mod auth;

pub const DUMMY_ARGUMENT: &[(&str, &str)] = &[("", "")];

/// The one owner of the session state
///
/// Cheap to clone and safe to hand to every view: all consumers read through
/// the accessors and mutate only through the operations in [`auth`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    api_client: reqwest::Client,
    storage: Arc<dyn SessionStorage>,
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug)]
struct StoreInner {
    server_address: String,
    state: SessionState,
    // Bumped by every logout. Asynchronous adoption paths capture the value
    // at initiation and may only commit while it is unchanged so a logout
    // always wins over in-flight work.
    epoch: u64,
}

/// Authentication status as the view layer sees it
///
/// `Bootstrapping` is only ever observed between startup and the completion
/// of [`SessionStore::initialize`]; an authenticated state always carries the
/// resolved user so the two can never disagree.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Bootstrapping,
    Anonymous,
    Authenticated(Arc<SessionUser>),
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Returns `true` while startup session restoration has not finished yet
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Bootstrapping)
    }

    pub fn user(&self) -> Option<Arc<SessionUser>> {
        match self {
            Self::Authenticated(user) => Some(Arc::clone(user)),
            Self::Bootstrapping | Self::Anonymous => None,
        }
    }
}

#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted and the profile endpoint confirmed the session
    Success,
    /// Credentials accepted but the profile endpoint was unavailable, the
    /// session is running on a synthesized display-only user
    SuccessDegraded,
    /// A logout was issued while this login was in flight and won
    Superseded,
}

impl LoginOutcome {
    /// Returns `true` if the login outcome is
    /// [`Success`] or [`SuccessDegraded`]
    ///
    /// [`Success`]: LoginOutcome::Success
    /// [`SuccessDegraded`]: LoginOutcome::SuccessDegraded
    #[must_use]
    pub fn is_any_success(&self) -> bool {
        matches!(self, Self::Success) || matches!(self, Self::SuccessDegraded)
    }
}

impl StoreInner {
    #[tracing::instrument]
    fn new(server_address: String) -> Self {
        Self {
            server_address,
            state: SessionState::default(),
            epoch: 0,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        // TODO 3: Load url from deployment config into binary at compile time
        Self::new(
            "http://localhost:8080".to_string(),
            Arc::new(crate::storage::InMemoryStorage::default()),
        )
    }
}

impl SessionStore {
    #[tracing::instrument(name = "NEW SESSION-STORE", skip(storage))]
    pub fn new(server_address: String, storage: Arc<dyn SessionStorage>) -> Self {
        let api_client = reqwest::Client::builder()
            .build()
            .expect("Unable to create reqwest client");
        Self {
            api_client,
            storage,
            inner: Arc::new(Mutex::new(StoreInner::new(server_address))),
        }
    }

    #[tracing::instrument(skip(ui_notify))]
    pub fn health_check<F>(&self, ui_notify: F) -> oneshot::Receiver<anyhow::Result<()>>
    where
        F: UiCallBack,
    {
        self.send_request_expect_empty(PATH_HEALTH_CHECK, &DUMMY_ARGUMENT, ui_notify)
    }

    #[tracing::instrument(skip(args, on_done))]
    // WARNING: Must skip args as it may contain sensitive info and "safe" versions
    // would usually already be logged by the caller
    fn initiate_request<T, F, O>(&self, path_spec: PathSpec, args: &T, on_done: F)
    where
        T: serde::Serialize + Debug,
        F: ChannelCallBack<O>,
        O: ChannelCallBackOutput,
    {
        self.initiate_request_with_token(path_spec, args, self.stored_token(), on_done)
    }

    fn initiate_request_with_token<T, F, O>(
        &self,
        path_spec: PathSpec,
        args: &T,
        token: Option<AuthToken>,
        on_done: F,
    ) where
        T: serde::Serialize + Debug,
        F: ChannelCallBack<O>,
        O: ChannelCallBackOutput,
    {
        let is_get_method = path_spec.method == Method::GET;
        let mut request = self
            .api_client
            .request(path_spec.method, self.path_to_url(path_spec.path));
        request = if is_get_method {
            request.query(&args)
        } else {
            request.json(&args)
        };
        if let Some(token) = token {
            request = request.bearer_auth(token.as_ref());
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            request = request
                .timeout(directory_shared::const_config::client::CLIENT_REQUEST_TIMEOUT.into());
        }
        reqwest_cross::fetch(request, on_done)
    }

    fn send_request_expect_json<F, T, U>(
        &self,
        path_spec: PathSpec,
        args: &T,
        ui_notify: F,
    ) -> oneshot::Receiver<anyhow::Result<U>>
    where
        T: serde::Serialize + std::fmt::Debug,
        F: UiCallBack,
        U: Send + std::fmt::Debug + serde::de::DeserializeOwned + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let on_done = move |resp: reqwest::Result<reqwest::Response>| async {
            let msg = process_json_body(resp).await;
            tx.send(msg).expect("failed to send oneshot msg");
            ui_notify();
        };
        self.initiate_request(path_spec, args, on_done);
        rx
    }

    fn send_request_expect_empty<F, T>(
        &self,
        path_spec: PathSpec,
        args: &T,
        ui_notify: F,
    ) -> oneshot::Receiver<anyhow::Result<()>>
    where
        T: serde::Serialize + std::fmt::Debug,
        F: UiCallBack,
    {
        let (tx, rx) = oneshot::channel();
        let on_done = move |resp: reqwest::Result<reqwest::Response>| async {
            let msg = process_empty(resp).await;
            tx.send(msg).expect("failed to send oneshot msg");
            ui_notify();
        };
        self.initiate_request(path_spec, args, on_done);
        rx
    }

    fn send_request_no_wait<T>(&self, path_spec: PathSpec, args: &T, token: Option<AuthToken>)
    where
        T: serde::Serialize + std::fmt::Debug,
    {
        self.initiate_request_with_token(path_spec, args, token, |_| async {});
    }

    #[tracing::instrument(ret)]
    fn path_to_url(&self, path: &str) -> String {
        format!(
            "{}{path}",
            &self
                .inner
                .lock()
                .expect("failed to unlock store mutex")
                .server_address
        )
    }

    /// Snapshot of the current session state
    pub fn state(&self) -> SessionState {
        self.inner.lock().expect("mutex poisoned").state.clone()
    }

    pub fn user_info(&self) -> Option<Arc<SessionUser>> {
        self.state().user()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Synchronous read of the locally stored access token
    pub fn stored_token(&self) -> Option<AuthToken> {
        self.storage
            .get(STORAGE_KEY_ACCESS_TOKEN)
            .map(AuthToken::from)
    }

    fn current_epoch(&self) -> u64 {
        self.inner.lock().expect("mutex poisoned").epoch
    }
}

#[tracing::instrument(ret, err(Debug))]
async fn process_empty(response: reqwest::Result<reqwest::Response>) -> anyhow::Result<()> {
    let (response, status) = extract_response(response)?;
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(handle_error(response).await)
    }
}

#[tracing::instrument(ret, err(Debug))]
async fn process_json_body<T>(response: reqwest::Result<reqwest::Response>) -> anyhow::Result<T>
where
    T: Debug + serde::de::DeserializeOwned,
{
    let (response, status) = extract_response(response)?;
    match status {
        StatusCode::OK => Ok(response
            .json()
            .await
            .context("failed to parse result as json")?),
        _ => Err(handle_error(response).await),
    }
}

#[tracing::instrument(ret)]
async fn handle_error(response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    debug_assert!(
        !status.is_success(),
        "this is supposed to be an error, right? Status code is: {status}"
    );
    let Ok(body) = response.text().await else {
        return anyhow!("failed to get response body");
    };
    if body.is_empty() {
        anyhow!("request failed with status code: {status} and no body")
    } else {
        anyhow!("{body}")
    }
}

/// Provides a way to standardize the error message
#[tracing::instrument(ret, err(Debug))]
fn extract_response(
    response: reqwest::Result<reqwest::Response>,
) -> anyhow::Result<(reqwest::Response, StatusCode)> {
    if response.is_err() {
        info!("Response is err: {:#?}", response);
    }
    let response = response.context("failed to send request")?;
    let status = response.status();
    Ok((response, status))
}

pub trait UiCallBack: 'static + Send + FnOnce() {}
impl<T> UiCallBack for T where T: 'static + Send + FnOnce() {}

#[cfg(not(target_arch = "wasm32"))]
pub mod closure_traits {
    pub trait ChannelCallBack<O>:
        'static + Send + FnOnce(reqwest::Result<reqwest::Response>) -> O
    {
    }
    impl<T, O> ChannelCallBack<O> for T where
        T: 'static + Send + FnOnce(reqwest::Result<reqwest::Response>) -> O
    {
    }
    pub trait ChannelCallBackOutput: futures::Future<Output = ()> + Send {}
    impl<T> ChannelCallBackOutput for T where T: futures::Future<Output = ()> + Send {}
}

#[cfg(target_arch = "wasm32")]
pub mod closure_traits {
    pub trait ChannelCallBack<O>:
        'static + FnOnce(reqwest::Result<reqwest::Response>) -> O
    {
    }
    impl<T, O> ChannelCallBack<O> for T where
        T: 'static + FnOnce(reqwest::Result<reqwest::Response>) -> O
    {
    }
    pub trait ChannelCallBackOutput: futures::Future<Output = ()> {}
    impl<T> ChannelCallBackOutput for T where T: futures::Future<Output = ()> {}
}
