//! Session lifecycle operations: bootstrap, login, logout, registration and
//! profile refresh
//!
//! All mutation of [`SessionState`] lives here. The transitions follow one
//! rule everywhere: an operation captures the store epoch when it starts and
//! its result is only adopted if no logout happened in between.

use anyhow::Context;
use directory_shared::{
    const_config::{
        path::{PATH_AUTH_LOGIN, PATH_AUTH_LOGOUT, PATH_AUTH_ME, PATH_AUTH_REGISTRATION},
        storage::{STORAGE_KEY_ACCESS_TOKEN, STORAGE_KEY_SESSION_USER},
    },
    errors::NotLoggedInError,
    log_err_as_error, log_err_as_warn,
    req_args::{LoginReqArgs, RegisterReqArgs},
    token::AuthToken,
    uac::{synthesize_fallback_user, AuthError, LoginResponse, SessionUser, UserRecord},
};
use directory_time::Timestamp;
use futures::channel::oneshot;
use reqwest::StatusCode;
use secrecy::ExposeSecret as _;
use std::sync::Arc;
use tracing::info;

use super::{
    extract_response, handle_error, process_empty, process_json_body, LoginOutcome, SessionState,
    SessionStore, UiCallBack, DUMMY_ARGUMENT,
};

/// What gets written under the session-user storage key
///
/// `saved_at` is only used for logging how stale an adopted snapshot was.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotEnvelope {
    saved_at: Timestamp,
    user: UserRecord,
}

impl SessionStore {
    /// Restores the session at startup, to be called once
    ///
    /// Never yields an error: every failure path degrades to an anonymous
    /// state instead so the application shell cannot get stuck. With no
    /// stored token this resolves immediately without touching the network.
    #[tracing::instrument(skip(ui_notify))]
    pub fn initialize<F: UiCallBack>(&self, ui_notify: F) -> oneshot::Receiver<anyhow::Result<()>> {
        let (tx, rx) = oneshot::channel();
        let epoch = self.current_epoch();
        let Some(token) = self.stored_token() else {
            self.finish_bootstrap(epoch);
            tx.send(Ok(())).expect("failed to send oneshot msg");
            ui_notify();
            return rx;
        };
        let store = self.clone();
        let on_done = move |resp: reqwest::Result<reqwest::Response>| async move {
            let msg = process_bootstrap(resp, store, epoch).await;
            tx.send(msg).expect("failed to send oneshot msg");
            ui_notify();
        };
        self.initiate_request_with_token(PATH_AUTH_ME, &DUMMY_ARGUMENT, Some(token), on_done);
        rx
    }

    #[tracing::instrument(skip(args, ui_notify))]
    pub fn login<F: UiCallBack>(
        &self,
        args: LoginReqArgs,
        ui_notify: F,
    ) -> oneshot::Receiver<anyhow::Result<LoginOutcome>> {
        let (tx, rx) = oneshot::channel();
        let body = serde_json::json!({
            "username": args.username.clone(),
            "password": args.password.expose_secret(),
        });
        let epoch = self.current_epoch();
        let store = self.clone();
        let on_done = move |resp: reqwest::Result<reqwest::Response>| async move {
            let msg = process_login(resp, store, args, epoch).await;
            tx.send(msg).expect("failed to send oneshot msg");
            ui_notify();
        };
        self.initiate_request(PATH_AUTH_LOGIN, &body, on_done);
        rx
    }

    /// Ends the session locally no matter what the server says
    ///
    /// The state, token and snapshot are cleared before the request is even
    /// sent and a transport failure is only logged, so the resolved value is
    /// always `Ok`. Safe to call repeatedly.
    #[tracing::instrument(skip(ui_notify))]
    pub fn logout<F: UiCallBack>(&self, ui_notify: F) -> oneshot::Receiver<anyhow::Result<()>> {
        let token = self.stored_token();
        self.clear_session_local(); // Clear session even if the logout request fails
        let (tx, rx) = oneshot::channel();
        let on_done = move |resp: reqwest::Result<reqwest::Response>| async move {
            let result = process_empty(resp).await;
            log_err_as_warn!(result);
            tx.send(Ok(())).expect("failed to send oneshot msg");
            ui_notify();
        };
        self.initiate_request_with_token(PATH_AUTH_LOGOUT, &"", token, on_done);
        rx
    }

    /// Fire-and-forget variant of [`logout`](Self::logout) for shutdown paths
    #[tracing::instrument]
    pub fn logout_no_wait(&self) {
        let token = self.stored_token();
        self.clear_session_local(); // Clear session even if the logout request fails
        self.send_request_no_wait(PATH_AUTH_LOGOUT, &"", token);
    }

    /// Registration is not login: the session state is never touched and the
    /// caller is expected to log in afterwards
    #[tracing::instrument(skip(args, ui_notify))]
    // WARNING: Must skip args as it contains the password
    pub fn register<F: UiCallBack>(
        &self,
        args: RegisterReqArgs,
        ui_notify: F,
    ) -> oneshot::Receiver<anyhow::Result<UserRecord>> {
        if let Err(e) = args.validate() {
            let (tx, rx) = oneshot::channel();
            tx.send(Err(e.into())).expect("failed to send oneshot msg");
            ui_notify();
            return rx;
        }
        let body = serde_json::json!({
            "username": args.username,
            "password": args.password.expose_secret(),
            "confirmPassword": args.confirm_password.expose_secret(),
            "email": args.email,
        });
        self.send_request_expect_json(PATH_AUTH_REGISTRATION, &body, ui_notify)
    }

    /// Best-effort re-fetch of the profile
    ///
    /// A good session is never downgraded because a refresh failed; the error
    /// is returned for the caller to ignore or surface as it sees fit.
    #[tracing::instrument(skip(ui_notify))]
    pub fn refresh_user_info<F: UiCallBack>(
        &self,
        ui_notify: F,
    ) -> oneshot::Receiver<anyhow::Result<()>> {
        let (tx, rx) = oneshot::channel();
        if !self.is_logged_in() {
            tx.send(Err(NotLoggedInError.into()))
                .expect("failed to send oneshot msg");
            ui_notify();
            return rx;
        }
        let epoch = self.current_epoch();
        let store = self.clone();
        let on_done = move |resp: reqwest::Result<reqwest::Response>| async move {
            let msg = process_refresh(resp, store, epoch).await;
            tx.send(msg).expect("failed to send oneshot msg");
            ui_notify();
        };
        self.initiate_request(PATH_AUTH_ME, &DUMMY_ARGUMENT, on_done);
        rx
    }

    /// Installs the user as the active session unless a logout happened since
    /// `epoch` was captured (logout must always win over in-flight work)
    fn commit_session(&self, epoch: u64, user: Arc<SessionUser>) -> bool {
        let mut inner = self.inner.lock().expect("mutex poisoned");
        if inner.epoch != epoch {
            return false;
        }
        inner.state = SessionState::Authenticated(user);
        true
    }

    /// Leaves the bootstrap phase without a session if nothing else resolved
    /// the state in the meantime
    fn finish_bootstrap(&self, epoch: u64) {
        let mut inner = self.inner.lock().expect("mutex poisoned");
        if inner.epoch == epoch && matches!(inner.state, SessionState::Bootstrapping) {
            inner.state = SessionState::Anonymous;
        }
    }

    fn clear_session_local(&self) {
        {
            let mut inner = self.inner.lock().expect("mutex poisoned");
            inner.state = SessionState::Anonymous;
            inner.epoch += 1;
        }
        self.storage.remove(STORAGE_KEY_ACCESS_TOKEN);
        self.storage.remove(STORAGE_KEY_SESSION_USER);
    }

    fn persist_token(&self, token: &AuthToken) {
        self.storage.set(STORAGE_KEY_ACCESS_TOKEN, token.as_ref());
    }

    fn discard_token(&self) {
        self.storage.remove(STORAGE_KEY_ACCESS_TOKEN);
    }

    fn persist_snapshot(&self, user: &SessionUser) {
        let envelope = SnapshotEnvelope {
            saved_at: Timestamp::now(),
            user: UserRecord::from(user),
        };
        let result = serde_json::to_string(&envelope)
            .map(|raw| self.storage.set(STORAGE_KEY_SESSION_USER, &raw));
        log_err_as_error!(result);
    }

    /// Reads the persisted snapshot, discarding it if it cannot be used
    fn load_snapshot(&self) -> Option<SessionUser> {
        let raw = self.storage.get(STORAGE_KEY_SESSION_USER)?;
        let parsed = serde_json::from_str::<SnapshotEnvelope>(&raw)
            .context("failed to parse the persisted session snapshot")
            .and_then(|envelope| {
                if let Some(age) = envelope.saved_at.elapsed() {
                    info!("adopting persisted session snapshot, {age}s old");
                }
                SessionUser::try_from(envelope.user)
            });
        match parsed {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(?e, "discarding unusable session snapshot");
                self.storage.remove(STORAGE_KEY_SESSION_USER);
                None
            }
        }
    }
}

#[tracing::instrument(ret, err(Debug), skip(store, args))]
async fn process_login(
    response: reqwest::Result<reqwest::Response>,
    store: SessionStore,
    args: LoginReqArgs,
    epoch: u64,
) -> anyhow::Result<LoginOutcome> {
    let (response, status) = extract_response(response)?;
    match status {
        StatusCode::OK => {
            let login_response: LoginResponse = response
                .json()
                .await
                .context("failed to parse result as json")?;
            let token = login_response.access_token.map(AuthToken::from);
            let (user, outcome) = match fetch_profile(&store, token.as_ref()).await {
                Ok(user) => (user, LoginOutcome::Success),
                Err(e) => {
                    info!("profile fetch after login failed, synthesizing a fallback user: {e:#}");
                    (synthesize_fallback_user(&args), LoginOutcome::SuccessDegraded)
                }
            };
            let user = Arc::new(user);
            if store.commit_session(epoch, Arc::clone(&user)) {
                if let Some(token) = token.as_ref() {
                    store.persist_token(token);
                }
                store.persist_snapshot(&user);
                Ok(outcome)
            } else {
                Ok(LoginOutcome::Superseded)
            }
        }
        StatusCode::UNAUTHORIZED => Err(AuthError::InvalidUserOrPassword.into()),
        _ => Err(handle_error(response).await),
    }
}

#[tracing::instrument(ret, err(Debug), skip(store))]
async fn process_bootstrap(
    response: reqwest::Result<reqwest::Response>,
    store: SessionStore,
    epoch: u64,
) -> anyhow::Result<()> {
    let profile: anyhow::Result<SessionUser> = async {
        let record: UserRecord = process_json_body(response).await?;
        record
            .try_into()
            .context("profile response could not be resolved into a session user")
    }
    .await;
    match profile {
        Ok(user) => {
            let user = Arc::new(user);
            if store.commit_session(epoch, Arc::clone(&user)) {
                store.persist_snapshot(&user);
            }
        }
        Err(e) => {
            info!("session restore from the backend failed, trying the local snapshot: {e:#}");
            match store.load_snapshot() {
                Some(user) => {
                    let _ = store.commit_session(epoch, Arc::new(user));
                }
                None => {
                    // The token did not produce a session and there is
                    // nothing cached, so the token is worthless now
                    store.discard_token();
                }
            }
        }
    }
    store.finish_bootstrap(epoch);
    Ok(())
}

#[tracing::instrument(ret, err(Debug), skip(store))]
async fn process_refresh(
    response: reqwest::Result<reqwest::Response>,
    store: SessionStore,
    epoch: u64,
) -> anyhow::Result<()> {
    let (response, status) = extract_response(response)?;
    let record: UserRecord = match status {
        StatusCode::OK => response
            .json()
            .await
            .context("failed to parse result as json")?,
        StatusCode::UNAUTHORIZED => return Err(AuthError::SessionExpired.into()),
        _ => return Err(handle_error(response).await),
    };
    let user: SessionUser = record
        .try_into()
        .context("profile response could not be resolved into a session user")?;
    let user = Arc::new(user);
    if store.commit_session(epoch, Arc::clone(&user)) {
        store.persist_snapshot(&user);
    }
    Ok(())
}

/// Fetches and resolves the current user's profile
///
/// Takes the token explicitly because on the login path it is not in storage
/// yet (it only gets persisted once the login commits).
async fn fetch_profile(
    store: &SessionStore,
    token: Option<&AuthToken>,
) -> anyhow::Result<SessionUser> {
    let mut request = store
        .api_client
        .request(PATH_AUTH_ME.method, store.path_to_url(PATH_AUTH_ME.path));
    if let Some(token) = token {
        request = request.bearer_auth(token.as_ref());
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        request =
            request.timeout(directory_shared::const_config::client::CLIENT_REQUEST_TIMEOUT.into());
    }
    let record: UserRecord = process_json_body(request.send().await).await?;
    record
        .try_into()
        .context("profile response could not be resolved into a session user")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStorage, SessionStorage};
    use directory_shared::uac::Role;

    fn no_cb() {}

    /// Nothing listens on the discard port so requests fail fast
    fn unreachable_store() -> (SessionStore, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::default());
        let store = SessionStore::new(
            "http://127.0.0.1:9".to_string(),
            Arc::clone(&storage) as Arc<dyn SessionStorage>,
        );
        (store, storage)
    }

    fn moderator_user() -> SessionUser {
        let record: UserRecord = serde_json::from_value(serde_json::json!({
            "id": 7,
            "username": "volkova.k",
            "role": "MODERATOR",
            "moderatorId": 7,
            "departmentsIds": [9],
        }))
        .unwrap();
        record.try_into().unwrap()
    }

    #[tokio::test]
    async fn bootstrap_without_token_resolves_anonymous_immediately() {
        // Arrange
        let (store, _storage) = unreachable_store();
        assert!(store.is_loading());

        // Act
        let result = store.initialize(no_cb).await.unwrap();

        // Assert
        result.unwrap();
        assert!(!store.is_loading());
        assert!(!store.is_logged_in());
        assert!(store.user_info().is_none());
    }

    #[tokio::test]
    async fn bootstrap_adopts_snapshot_when_backend_is_unreachable() {
        // Arrange
        let (store, storage) = unreachable_store();
        storage.set(STORAGE_KEY_ACCESS_TOKEN, "stale-but-present");
        store.persist_snapshot(&moderator_user());

        // Act
        let result = store.initialize(no_cb).await.unwrap();

        // Assert
        result.unwrap();
        let user = store.user_info().expect("expected a restored session");
        assert!(store.is_logged_in());
        assert_eq!(user.role, Role::Moderator);
        assert_eq!(user.id, 7u64.into());
    }

    #[tokio::test]
    async fn bootstrap_discards_token_when_nothing_can_be_restored() {
        // Arrange
        let (store, storage) = unreachable_store();
        storage.set(STORAGE_KEY_ACCESS_TOKEN, "stale-but-present");
        storage.set(STORAGE_KEY_SESSION_USER, "not even json");

        // Act
        let result = store.initialize(no_cb).await.unwrap();

        // Assert
        result.unwrap();
        assert!(!store.is_logged_in());
        assert!(!store.is_loading());
        assert_eq!(storage.get(STORAGE_KEY_ACCESS_TOKEN), None);
        assert_eq!(storage.get(STORAGE_KEY_SESSION_USER), None);
    }

    #[tokio::test]
    async fn logout_clears_session_even_when_transport_fails() {
        // Arrange - authenticated session with persisted artifacts
        let (store, storage) = unreachable_store();
        let user = Arc::new(moderator_user());
        assert!(store.commit_session(store.current_epoch(), Arc::clone(&user)));
        store.persist_token(&AuthToken::from("token".to_string()));
        store.persist_snapshot(&user);
        assert!(store.is_logged_in());

        // Act - the logout request itself can only fail (nothing is listening)
        let result = store.logout(no_cb).await.unwrap();

        // Assert
        result.unwrap();
        assert!(!store.is_logged_in());
        assert!(store.user_info().is_none());
        assert_eq!(storage.get(STORAGE_KEY_ACCESS_TOKEN), None);
        assert_eq!(storage.get(STORAGE_KEY_SESSION_USER), None);

        // Act - logging out again is harmless
        store.logout(no_cb).await.unwrap().unwrap();
        assert!(!store.is_logged_in());
    }

    #[test]
    fn commit_with_stale_epoch_is_rejected_so_logout_wins() {
        // Arrange
        let (store, _storage) = unreachable_store();
        let epoch_at_login_start = store.current_epoch();

        // Act - a logout lands while the login is still in flight
        store.clear_session_local();

        // Assert - the late commit must lose
        let user = Arc::new(moderator_user());
        assert!(!store.commit_session(epoch_at_login_start, Arc::clone(&user)));
        assert!(!store.is_logged_in());

        // A commit under the current epoch still works
        assert!(store.commit_session(store.current_epoch(), user));
        assert!(store.is_logged_in());
    }

    #[tokio::test]
    async fn refresh_requires_a_session() {
        // Arrange
        let (store, _storage) = unreachable_store();
        store.finish_bootstrap(store.current_epoch());

        // Act
        let result = store.refresh_user_info(no_cb).await.unwrap();

        // Assert
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<NotLoggedInError>().is_some());
    }

    #[tokio::test]
    async fn refresh_failure_leaves_the_session_untouched() {
        // Arrange
        let (store, _storage) = unreachable_store();
        let user = Arc::new(moderator_user());
        assert!(store.commit_session(store.current_epoch(), Arc::clone(&user)));

        // Act - nothing is listening so the refresh can only fail
        let result = store.refresh_user_info(no_cb).await.unwrap();

        // Assert
        assert!(result.is_err());
        assert!(store.is_logged_in());
        assert_eq!(store.user_info().unwrap(), user);
    }

    #[test]
    fn snapshot_round_trips_through_storage() {
        // Arrange
        let (store, _storage) = unreachable_store();
        let user = moderator_user();

        // Act
        store.persist_snapshot(&user);
        let restored = store.load_snapshot().expect("snapshot should parse");

        // Assert
        assert_eq!(restored, user);
    }
}
